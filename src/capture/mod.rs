//! # Frame Capture
//!
//! The `FrameSource` trait owns the capture device. Nothing else touches the
//! stream: the session asks for a handle, polls frames through it and hands it
//! back on teardown.
//!
//! ```text
//! open(selector, constraints) ──▶ StreamHandle ──▶ current_frame() ──▶ PixelBuffer
//!                                      │
//!                                      └──▶ close()   (idempotent)
//! ```
//!
//! ## Modules
//!
//! - [`image_dir`]: replays image files from directories as camera frames

pub mod image_dir;

pub use image_dir::ImageDirSource;

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ============================================================================
// Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Luma8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// A single frame snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data,
        }
    }

    pub fn luma(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Luma8,
            data,
        }
    }

    /// True when `data` holds exactly `width * height` pixels.
    pub fn is_well_formed(&self) -> bool {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.format.bytes_per_pixel()));
        expected == Some(self.data.len())
    }

    /// Grayscale value at (x, y). Callers must stay within bounds.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Luma8 => self.data[idx],
            PixelFormat::Rgba8 => {
                let r = self.data[idx] as u32;
                let g = self.data[idx + 1] as u32;
                let b = self.data[idx + 2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            }
        }
    }
}

// ============================================================================
// Devices and constraints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

/// Resolution and facing hints. Sources honour them where they can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            facing: FacingMode::Environment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Whatever device the source considers default.
    Any,
    /// Exactly the device at this position in `devices()`.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
}

/// Label shown in the camera picker: parenthesised vendor/model suffixes are
/// dropped and an empty label becomes `Camera N` (1-based).
pub fn display_label(label: &str, index: usize) -> String {
    let mut cleaned = label.to_string();
    while let Some(open) = cleaned.find('(') {
        let Some(close_rel) = cleaned[open..].find(')') else {
            break;
        };
        cleaned.replace_range(open..open + close_rel + 1, "");
    }
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("Camera {}", index + 1)
    } else {
        cleaned.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    PermissionDenied,
    DeviceNotFound,
    /// The device exists but another process holds it or it failed to start.
    DeviceBusy,
    ConstraintsUnsatisfiable,
    Aborted,
    Unknown(String),
}

impl CameraError {
    /// Maps a device-reported failure reason onto the taxonomy.
    ///
    /// `name` is the reason identifier (e.g. `NotAllowedError`); `message` is
    /// kept only for reasons we do not recognise.
    pub fn from_reason(name: &str, message: &str) -> CameraError {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                CameraError::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" => CameraError::DeviceNotFound,
            "NotReadableError" | "TrackStartError" => CameraError::DeviceBusy,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                CameraError::ConstraintsUnsatisfiable
            }
            "AbortError" => CameraError::Aborted,
            _ if message.is_empty() => CameraError::Unknown(name.to_string()),
            _ => CameraError::Unknown(message.to_string()),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied => write!(f, "camera permission denied"),
            CameraError::DeviceNotFound => write!(f, "no camera found"),
            CameraError::DeviceBusy => write!(f, "camera is in use or could not start"),
            CameraError::ConstraintsUnsatisfiable => {
                write!(f, "camera cannot satisfy the requested settings")
            }
            CameraError::Aborted => write!(f, "camera start was aborted"),
            CameraError::Unknown(msg) => write!(f, "camera error: {msg}"),
        }
    }
}

impl std::error::Error for CameraError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorchUnsupported;

impl fmt::Display for TorchUnsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "torch not supported by this device")
    }
}

impl std::error::Error for TorchUnsupported {}

// ============================================================================
// Source trait
// ============================================================================

/// Capture device abstraction. Everything runs on one logical task, so
/// futures need not be `Send`.
#[async_trait(?Send)]
pub trait FrameSource {
    async fn devices(&mut self) -> Result<Vec<DeviceInfo>, CameraError>;

    /// Opens a stream. Any stream already held is released first.
    async fn open(
        &mut self,
        selector: DeviceSelector,
        constraints: &StreamConstraints,
    ) -> Result<StreamHandle, CameraError>;

    /// Latest frame, or `None` until the stream has produced one with known
    /// dimensions.
    fn current_frame(&mut self, handle: StreamHandle) -> Option<PixelBuffer>;

    /// Stops the stream. Safe to call on a closed or unknown handle.
    fn close(&mut self, handle: StreamHandle);

    async fn set_torch(&mut self, handle: StreamHandle, enabled: bool)
    -> Result<(), TorchUnsupported>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reason_maps_known_names() {
        assert_eq!(
            CameraError::from_reason("NotAllowedError", "denied"),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::from_reason("SecurityError", ""),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::from_reason("NotFoundError", ""),
            CameraError::DeviceNotFound
        );
        assert_eq!(
            CameraError::from_reason("NotReadableError", ""),
            CameraError::DeviceBusy
        );
        assert_eq!(
            CameraError::from_reason("TrackStartError", ""),
            CameraError::DeviceBusy
        );
        assert_eq!(
            CameraError::from_reason("OverconstrainedError", "width"),
            CameraError::ConstraintsUnsatisfiable
        );
        assert_eq!(CameraError::from_reason("AbortError", ""), CameraError::Aborted);
    }

    #[test]
    fn test_from_reason_unknown_keeps_message() {
        assert_eq!(
            CameraError::from_reason("WeirdError", "driver exploded"),
            CameraError::Unknown("driver exploded".to_string())
        );
        assert_eq!(
            CameraError::from_reason("WeirdError", ""),
            CameraError::Unknown("WeirdError".to_string())
        );
    }

    #[test]
    fn test_display_label_strips_parenthesised_suffixes() {
        assert_eq!(
            display_label("FaceTime HD Camera (Built-in) (05ac:8514)", 0),
            "FaceTime HD Camera"
        );
        assert_eq!(display_label("Back (x) Camera", 1), "Back  Camera");
        assert_eq!(display_label("Dangling (paren", 0), "Dangling (paren");
    }

    #[test]
    fn test_display_label_falls_back_to_index() {
        assert_eq!(display_label("", 0), "Camera 1");
        assert_eq!(display_label("  (usb)  ", 2), "Camera 3");
    }

    #[test]
    fn test_luma_at_rgba_and_gray() {
        let rgba = PixelBuffer::rgba(2, 1, vec![255, 255, 255, 255, 0, 0, 0, 255]);
        assert!(rgba.is_well_formed());
        assert_eq!(rgba.luma_at(0, 0), 255);
        assert_eq!(rgba.luma_at(1, 0), 0);

        let gray = PixelBuffer::luma(1, 2, vec![10, 200]);
        assert_eq!(gray.luma_at(0, 1), 200);
    }

    #[test]
    fn test_malformed_buffer_detected() {
        assert!(!PixelBuffer::rgba(2, 2, vec![0; 3]).is_well_formed());
        assert!(!PixelBuffer::luma(u32::MAX, u32::MAX, vec![]).is_well_formed());
    }
}
