//! # Decoder Capability
//!
//! The scan loop treats decoding as a black box: hand over a frame, get back
//! the payload text if a code was found. Any library with that shape fits
//! behind [`Decoder`].

pub mod qr;

pub use qr::QrDecoder;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::PixelBuffer;

/// Whether to also try the frame with light/dark swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InversionAttempts {
    #[default]
    DontInvert,
    OnlyInvert,
    AttemptBoth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub inversion: InversionAttempts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame dimensions do not match its pixel data.
    InvalidFrame(String),
    Failed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
            DecodeError::Failed(msg) => write!(f, "decode failed: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

pub trait Decoder {
    /// `Ok(None)` means no code in this frame; errors are per-frame and the
    /// caller moves on to the next one.
    fn decode(
        &self,
        frame: &PixelBuffer,
        options: &DecodeOptions,
    ) -> Result<Option<String>, DecodeError>;
}
