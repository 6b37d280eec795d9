//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`). Every fake is
//! `Clone` and shares its state between clones: hand one clone to the session
//! and keep the other to script or inspect it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::{
    CameraError, DeviceInfo, DeviceSelector, FrameSource, PixelBuffer, StreamConstraints,
    StreamHandle, TorchUnsupported,
};
use crate::core::opener::{OpenError, UrlOpener};
use crate::core::scheduler::ManualScheduler;
use crate::core::session::{ScannerSession, SessionParts, SessionSettings};
use crate::core::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::decode::{DecodeError, DecodeOptions, Decoder};

// ============================================================================
// Storage
// ============================================================================

/// A store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(io::Error::other("storage unavailable").into())
    }

    fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
        Err(io::Error::other("storage unavailable").into())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(io::Error::other("storage unavailable").into())
    }
}

/// Reads and writes through to a `MemoryStore`, but refuses to delete.
#[derive(Clone, Default)]
pub struct StickyStore {
    pub inner: MemoryStore,
}

impl KeyValueStore for StickyStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(io::Error::other("remove not permitted").into())
    }
}

// ============================================================================
// Camera
// ============================================================================

struct FakeCamera {
    devices: Vec<DeviceInfo>,
    frames_ready: bool,
    open_error: Option<CameraError>,
    current: Option<StreamHandle>,
    next_handle: u64,
    open_calls: usize,
    close_calls: usize,
}

/// Two-device camera that always yields a small blank frame once open.
#[derive(Clone)]
pub struct FakeFrameSource {
    inner: Rc<RefCell<FakeCamera>>,
}

impl FakeFrameSource {
    pub fn new() -> Self {
        let devices = vec![
            DeviceInfo {
                id: "cam-0".to_string(),
                label: "Front".to_string(),
            },
            DeviceInfo {
                id: "cam-1".to_string(),
                label: "Back (05ac:1234)".to_string(),
            },
        ];
        Self {
            inner: Rc::new(RefCell::new(FakeCamera {
                devices,
                frames_ready: true,
                open_error: None,
                current: None,
                next_handle: 0,
                open_calls: 0,
                close_calls: 0,
            })),
        }
    }

    pub fn set_frames_ready(&self, ready: bool) {
        self.inner.borrow_mut().frames_ready = ready;
    }

    /// The next `open` fails with `error`; later ones succeed again.
    pub fn fail_next_open(&self, error: CameraError) {
        self.inner.borrow_mut().open_error = Some(error);
    }

    pub fn open_calls(&self) -> usize {
        self.inner.borrow().open_calls
    }

    /// Closes that actually released an open stream.
    pub fn close_calls(&self) -> usize {
        self.inner.borrow().close_calls
    }

    pub fn is_open(&self) -> bool {
        self.inner.borrow().current.is_some()
    }
}

#[async_trait(?Send)]
impl FrameSource for FakeFrameSource {
    async fn devices(&mut self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(self.inner.borrow().devices.clone())
    }

    async fn open(
        &mut self,
        selector: DeviceSelector,
        _constraints: &StreamConstraints,
    ) -> Result<StreamHandle, CameraError> {
        let mut cam = self.inner.borrow_mut();
        cam.open_calls += 1;
        if let Some(err) = cam.open_error.take() {
            return Err(err);
        }
        if let DeviceSelector::Index(i) = selector
            && i >= cam.devices.len()
        {
            return Err(CameraError::DeviceNotFound);
        }
        cam.next_handle += 1;
        let handle = StreamHandle(cam.next_handle);
        cam.current = Some(handle);
        Ok(handle)
    }

    fn current_frame(&mut self, handle: StreamHandle) -> Option<PixelBuffer> {
        let cam = self.inner.borrow();
        if cam.frames_ready && cam.current == Some(handle) {
            Some(PixelBuffer::luma(4, 4, vec![255; 16]))
        } else {
            None
        }
    }

    fn close(&mut self, handle: StreamHandle) {
        let mut cam = self.inner.borrow_mut();
        if cam.current == Some(handle) {
            cam.current = None;
            cam.close_calls += 1;
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

// ============================================================================
// Decoder
// ============================================================================

/// Returns queued results in order, then `Ok(None)` forever.
#[derive(Clone, Default)]
pub struct ScriptedDecoder {
    script: Rc<RefCell<VecDeque<Result<Option<String>, DecodeError>>>>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<Option<String>, DecodeError>) {
        self.script.borrow_mut().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(
        &self,
        _frame: &PixelBuffer,
        _options: &DecodeOptions,
    ) -> Result<Option<String>, DecodeError> {
        self.calls.set(self.calls.get() + 1);
        self.script.borrow_mut().pop_front().unwrap_or(Ok(None))
    }
}

// ============================================================================
// Opener
// ============================================================================

#[derive(Clone, Default)]
pub struct RecordingOpener {
    opened: Rc<RefCell<Vec<String>>>,
    fail: Rc<Cell<bool>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&mut self, url: &str) -> Result<(), OpenError> {
        if self.fail.get() {
            return Err(OpenError::Launch(io::Error::other("no browser")));
        }
        self.opened.borrow_mut().push(url.to_string());
        Ok(())
    }
}

// ============================================================================
// Session rig
// ============================================================================

/// A session wired to fakes, plus handles to drive and inspect them.
pub struct SessionRig {
    pub session: ScannerSession,
    pub clock: ManualScheduler,
    pub camera: FakeFrameSource,
    pub decoder: ScriptedDecoder,
    pub opener: RecordingOpener,
    pub store: MemoryStore,
}

impl SessionRig {
    /// Advances virtual time, delivering every timer that fires.
    pub fn run_for(&mut self, by: Duration) {
        let session = &mut self.session;
        self.clock.advance(by, |id| session.handle_timer(id));
    }

    pub fn opened(&self) -> Vec<String> {
        self.opener.opened()
    }

    pub fn opener_fails(&self) {
        self.opener.fail.set(true);
    }

    /// A fresh session over the same storage, as after a restart.
    pub fn reopen(&self) -> SessionRig {
        rig_with_store(self.store.clone())
    }
}

pub fn test_rig() -> SessionRig {
    rig_with_store(MemoryStore::new())
}

fn rig_with_store(store: MemoryStore) -> SessionRig {
    let clock = ManualScheduler::new();
    let camera = FakeFrameSource::new();
    let decoder = ScriptedDecoder::new();
    let opener = RecordingOpener::default();
    let parts = SessionParts {
        source: Box::new(camera.clone()),
        decoder: Box::new(decoder.clone()),
        scheduler: Box::new(clock.clone()),
        opener: Box::new(opener.clone()),
        store: Rc::new(store.clone()),
    };
    SessionRig {
        session: ScannerSession::new(parts, SessionSettings::default()),
        clock,
        camera,
        decoder,
        opener,
        store,
    }
}
