//! # Opening Links
//!
//! Links are handed to the system browser as a fresh, detached process. The
//! browser gets the URL and nothing else: no handle back to this process and
//! no referring page.

use std::fmt;
use std::io;

use log::info;

use crate::core::classify::is_web_link;

#[derive(Debug)]
pub enum OpenError {
    /// Refused: only http(s) links are ever opened.
    NotALink(String),
    Launch(io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::NotALink(s) => write!(f, "refusing to open non-web link: {s}"),
            OpenError::Launch(e) => write!(f, "failed to launch browser: {e}"),
        }
    }
}

impl std::error::Error for OpenError {}

pub trait UrlOpener {
    fn open(&mut self, url: &str) -> Result<(), OpenError>;
}

/// Hands links to the desktop's default browser through the `open` crate.
#[derive(Debug, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&mut self, url: &str) -> Result<(), OpenError> {
        if !is_web_link(url) {
            return Err(OpenError::NotALink(url.to_string()));
        }
        open::that_detached(url).map_err(OpenError::Launch)?;
        info!("Opened link in browser: {}", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_opener_refuses_non_links() {
        let mut opener = SystemOpener;
        assert!(matches!(
            opener.open("file:///etc/passwd"),
            Err(OpenError::NotALink(_))
        ));
        assert!(matches!(
            opener.open("javascript:alert(1)"),
            Err(OpenError::NotALink(_))
        ));
    }
}
