//! # Result Classification
//!
//! Decides whether a decoded payload is a navigable link or opaque text.
//!
//! Only absolute `http`/`https` URLs count as links. Everything else,
//! including `ftp://`, `mailto:`, bare hostnames and relative paths, is text.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The payload as scanned; it parsed as an absolute http(s) URL.
    Link(String),
    Text(String),
}

impl Classification {
    pub fn is_link(&self) -> bool {
        matches!(self, Classification::Link(_))
    }
}

/// Classifies a payload. Never panics; unparsable input is `Text`.
pub fn classify(payload: &str) -> Classification {
    if is_web_link(payload) {
        Classification::Link(payload.to_string())
    } else {
        Classification::Text(payload.to_string())
    }
}

pub fn is_web_link(payload: &str) -> bool {
    match Url::parse(payload) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
