//! # Image Directory Source
//!
//! Treats each configured directory as a camera. Opening a "camera" lists its
//! image files; every `current_frame()` call returns the next image, looping
//! forever, like a live feed pointed at a slideshow.
//!
//! Useful for kiosks fed by a capture daemon that drops snapshots into a
//! folder, and for reproducible end-to-end runs.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};

use super::{
    CameraError, DeviceInfo, DeviceSelector, FrameSource, PixelBuffer, StreamConstraints,
    StreamHandle, TorchUnsupported,
};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

struct OpenStream {
    handle: StreamHandle,
    frames: Vec<PathBuf>,
    cursor: usize,
}

pub struct ImageDirSource {
    dirs: Vec<PathBuf>,
    stream: Option<OpenStream>,
    next_handle: u64,
}

impl ImageDirSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            stream: None,
            next_handle: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn resolve(&self, selector: DeviceSelector) -> Result<&Path, CameraError> {
        let dir = match selector {
            DeviceSelector::Any => self.dirs.first(),
            DeviceSelector::Index(i) => self.dirs.get(i),
        };
        dir.map(PathBuf::as_path).ok_or(CameraError::DeviceNotFound)
    }
}

fn map_io_error(e: &io::Error) -> CameraError {
    match e.kind() {
        io::ErrorKind::NotFound => CameraError::DeviceNotFound,
        io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::Unknown(e.to_string()),
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

async fn list_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn load_frame(path: &Path) -> Option<PixelBuffer> {
    match image::open(path) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            if width == 0 || height == 0 {
                return None;
            }
            Some(PixelBuffer::rgba(width, height, rgba.into_raw()))
        }
        Err(e) => {
            warn!("Skipping unreadable frame {}: {}", path.display(), e);
            None
        }
    }
}

#[async_trait(?Send)]
impl FrameSource for ImageDirSource {
    async fn devices(&mut self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(self
            .dirs
            .iter()
            .map(|dir| DeviceInfo {
                id: dir.display().to_string(),
                label: dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn open(
        &mut self,
        selector: DeviceSelector,
        constraints: &StreamConstraints,
    ) -> Result<StreamHandle, CameraError> {
        if let Some(previous) = self.stream.as_ref().map(|s| s.handle) {
            self.close(previous);
        }

        let dir = self.resolve(selector)?.to_path_buf();
        let frames = list_frames(&dir).await.map_err(|e| map_io_error(&e))?;
        debug!(
            "Frames in {} are replayed as-is (ideal {}x{}, facing {:?})",
            dir.display(),
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing
        );

        self.next_handle += 1;
        let handle = StreamHandle(self.next_handle);
        info!(
            "Opened image source {} with {} frames ({:?})",
            dir.display(),
            frames.len(),
            handle
        );
        self.stream = Some(OpenStream {
            handle,
            frames,
            cursor: 0,
        });
        Ok(handle)
    }

    fn current_frame(&mut self, handle: StreamHandle) -> Option<PixelBuffer> {
        let stream = self.stream.as_mut().filter(|s| s.handle == handle)?;
        if stream.frames.is_empty() {
            return None;
        }
        let path = stream.frames[stream.cursor].clone();
        stream.cursor = (stream.cursor + 1) % stream.frames.len();
        load_frame(&path)
    }

    fn close(&mut self, handle: StreamHandle) {
        if self.stream.as_ref().is_some_and(|s| s.handle == handle) {
            self.stream = None;
            info!("Closed image source ({:?})", handle);
        }
    }

    async fn set_torch(
        &mut self,
        _handle: StreamHandle,
        _enabled: bool,
    ) -> Result<(), TorchUnsupported> {
        Err(TorchUnsupported)
    }
}
