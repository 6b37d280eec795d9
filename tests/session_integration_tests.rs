use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use qrscan::capture::{
    CameraError, DeviceInfo, DeviceSelector, FrameSource, ImageDirSource, PixelBuffer,
    StreamConstraints, StreamHandle, TorchUnsupported,
};
use qrscan::core::auto_open::AutoOpenState;
use qrscan::core::classify::{Classification, classify};
use qrscan::core::history::HistoryPolicy;
use qrscan::core::opener::{OpenError, UrlOpener};
use qrscan::core::scheduler::ManualScheduler;
use qrscan::core::session::{
    ScannerSession, ScannerStatus, SessionEvent, SessionParts, SessionSettings,
};
use qrscan::core::storage::{FileStore, KeyValueStore, MemoryStore, SCAN_HISTORY_KEY};
use qrscan::decode::{DecodeError, DecodeOptions, Decoder, QrDecoder};

// ============================================================================
// Helper Types
// ============================================================================

/// Single camera that always has a blank frame once open.
#[derive(Clone, Default)]
struct BlankCamera {
    closes: Rc<RefCell<usize>>,
    open: Rc<RefCell<Option<StreamHandle>>>,
}

#[async_trait(?Send)]
impl FrameSource for BlankCamera {
    async fn devices(&mut self) -> Result<Vec<DeviceInfo>, CameraError> {
        Ok(vec![DeviceInfo {
            id: "blank".to_string(),
            label: String::new(),
        }])
    }

    async fn open(
        &mut self,
        _selector: DeviceSelector,
        _constraints: &StreamConstraints,
    ) -> Result<StreamHandle, CameraError> {
        let handle = StreamHandle(1);
        *self.open.borrow_mut() = Some(handle);
        Ok(handle)
    }

    fn current_frame(&mut self, handle: StreamHandle) -> Option<PixelBuffer> {
        (*self.open.borrow() == Some(handle)).then(|| PixelBuffer::luma(8, 8, vec![255; 64]))
    }

    fn close(&mut self, handle: StreamHandle) {
        let mut open = self.open.borrow_mut();
        if *open == Some(handle) {
            *open = None;
            *self.closes.borrow_mut() += 1;
        }
    }

    async fn set_torch(&mut self, _: StreamHandle, _: bool) -> Result<(), TorchUnsupported> {
        Err(TorchUnsupported)
    }
}

/// Replays queued results, then reports "no code".
#[derive(Clone, Default)]
struct Script(Rc<RefCell<VecDeque<Result<Option<String>, DecodeError>>>>);

impl Script {
    fn then(&self, result: Result<Option<String>, DecodeError>) -> &Self {
        self.0.borrow_mut().push_back(result);
        self
    }
}

impl Decoder for Script {
    fn decode(&self, _: &PixelBuffer, _: &DecodeOptions) -> Result<Option<String>, DecodeError> {
        self.0.borrow_mut().pop_front().unwrap_or(Ok(None))
    }
}

#[derive(Clone, Default)]
struct Browser(Rc<RefCell<Vec<String>>>);

impl UrlOpener for Browser {
    fn open(&mut self, url: &str) -> Result<(), OpenError> {
        self.0.borrow_mut().push(url.to_string());
        Ok(())
    }
}

struct Harness {
    session: ScannerSession,
    clock: ManualScheduler,
    camera: BlankCamera,
    script: Script,
    browser: Browser,
}

impl Harness {
    fn new(store: Rc<dyn KeyValueStore>, settings: SessionSettings) -> Self {
        let clock = ManualScheduler::new();
        let camera = BlankCamera::default();
        let script = Script::default();
        let browser = Browser::default();
        let session = ScannerSession::new(
            SessionParts {
                source: Box::new(camera.clone()),
                decoder: Box::new(script.clone()),
                scheduler: Box::new(clock.clone()),
                opener: Box::new(browser.clone()),
                store,
            },
            settings,
        );
        Self {
            session,
            clock,
            camera,
            script,
            browser,
        }
    }

    fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::new()), SessionSettings::default())
    }

    fn start(&mut self) {
        futures::executor::block_on(self.session.start()).unwrap();
    }

    fn advance(&mut self, by: Duration) {
        let session = &mut self.session;
        self.clock.advance(by, |id| session.handle_timer(id));
    }

    fn opened(&self) -> Vec<String> {
        self.browser.0.borrow().clone()
    }
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classify_examples() {
    assert!(classify("https://a.com").is_link());
    assert!(classify("http://a.com/path?q=1").is_link());
    assert_eq!(classify("ftp://a.com"), Classification::Text("ftp://a.com".into()));
    assert_eq!(classify("not a url"), Classification::Text("not a url".into()));
    assert!(!classify("www.example.com").is_link());
    assert!(!classify("mailto:a@b.com").is_link());
}

// ============================================================================
// Full detection flow
// ============================================================================

#[test]
fn test_link_is_recorded_counted_down_and_opened_once() {
    let mut h = Harness::in_memory();
    h.script.then(Ok(Some("https://example.com".to_string())));
    h.start();

    h.advance(Duration::from_millis(300));
    assert_eq!(h.session.status(), &ScannerStatus::LinkDetected);
    assert_eq!(h.session.link_history().len(), 1);

    h.advance(Duration::from_secs(3));
    assert_eq!(h.opened(), vec!["https://example.com".to_string()]);

    let events = h.session.take_events();
    let countdowns: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Countdown { remaining, .. } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(countdowns, vec![3, 2, 1]);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::LinkOpened(_)))
            .count(),
        1
    );

    h.advance(Duration::from_secs(10));
    assert_eq!(h.opened().len(), 1);
}

#[test]
fn test_new_link_supersedes_pending_countdown() {
    let mut h = Harness::in_memory();
    h.script
        .then(Ok(Some("https://first.com".to_string())))
        .then(Ok(None))
        .then(Ok(Some("https://second.com".to_string())));
    h.start();
    h.advance(Duration::from_millis(900));

    assert_eq!(
        h.session.pending(),
        &AutoOpenState::Pending {
            url: "https://second.com".into(),
            remaining: 3
        }
    );
    h.advance(Duration::from_secs(10));
    assert_eq!(h.opened(), vec!["https://second.com".to_string()]);
}

#[test]
fn test_failing_decode_does_not_stop_next_tick() {
    let mut h = Harness::in_memory();
    h.script
        .then(Err(DecodeError::Failed("corrupt".into())))
        .then(Ok(Some("plain text".to_string())));
    h.start();
    h.advance(Duration::from_millis(600));
    assert_eq!(h.session.status(), &ScannerStatus::TextDetected);
    assert_eq!(h.session.scan_history()[0].payload, "plain text");
}

#[test]
fn test_stop_twice_closes_camera_once() {
    let mut h = Harness::in_memory();
    h.start();
    h.session.stop();
    h.session.stop();
    assert_eq!(*h.camera.closes.borrow(), 1);
    assert_eq!(h.clock.pending_count(), 0);

    let stopped = h
        .session
        .take_events()
        .into_iter()
        .filter(|e| *e == SessionEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn test_blank_camera_label_falls_back_to_index() {
    let mut h = Harness::in_memory();
    h.start();
    assert_eq!(h.session.camera_label().as_deref(), Some("Camera 1"));
}

// ============================================================================
// History policy and persistence
// ============================================================================

#[test]
fn test_history_cap_keeps_most_recent() {
    let settings = SessionSettings {
        scan_policy: HistoryPolicy::new(10, false),
        ..Default::default()
    };
    let mut h = Harness::new(Rc::new(MemoryStore::new()), settings);
    for i in 0..15 {
        h.session.detect(format!("payload {i}"));
    }
    let payloads: Vec<&str> = h
        .session
        .scan_history()
        .iter()
        .map(|r| r.payload.as_str())
        .collect();
    assert_eq!(payloads.len(), 10);
    assert_eq!(payloads[0], "payload 14");
    assert_eq!(payloads[9], "payload 5");
}

#[test]
fn test_dedup_policy_moves_repeat_to_front() {
    let settings = SessionSettings {
        scan_policy: HistoryPolicy::new(20, true),
        ..Default::default()
    };
    let mut h = Harness::new(Rc::new(MemoryStore::new()), settings);
    h.session.detect("X".to_string());
    h.session.detect("Y".to_string());
    h.session.detect("X".to_string());
    let payloads: Vec<&str> = h
        .session
        .scan_history()
        .iter()
        .map(|r| r.payload.as_str())
        .collect();
    assert_eq!(payloads, vec!["X", "Y"]);
}

#[test]
fn test_history_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        let mut h = Harness::new(Rc::new(store), SessionSettings::default());
        h.session.detect("https://persisted.com".to_string());
        h.session.detect("note".to_string());
        h.session.toggle_auto_open();
    }

    let store = FileStore::open(dir.path()).unwrap();
    let h = Harness::new(Rc::new(store), SessionSettings::default());
    assert_eq!(h.session.scan_history().len(), 2);
    assert_eq!(h.session.scan_history()[0].payload, "note");
    assert_eq!(h.session.link_history().len(), 1);
    assert!(!h.session.preferences().auto_open);
}

#[test]
fn test_malformed_persisted_history_loads_empty() {
    let store = MemoryStore::new();
    store.set(SCAN_HISTORY_KEY, b"[{\"data\": 42").unwrap();
    let h = Harness::new(Rc::new(store), SessionSettings::default());
    assert!(h.session.scan_history().is_empty());
}

// ============================================================================
// Real components
// ============================================================================

/// Renders `text` as a grayscale QR image, four pixels per module with a
/// four-module quiet zone.
fn qr_image(text: &str) -> image::GrayImage {
    let code = qrcode::QrCode::new(text).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 8) * 4;
    image::GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / 4, y / 4);
        let inside = (4..modules + 4).contains(&mx) && (4..modules + 4).contains(&my);
        let dark = inside
            && colors[((my - 4) * modules + (mx - 4)) as usize] == qrcode::Color::Dark;
        image::Luma([if dark { 0 } else { 255 }])
    })
}

#[tokio::test]
async fn test_image_dir_source_with_real_decoder_reads_saved_code() {
    let dir = tempfile::tempdir().unwrap();
    qr_image("https://example.com/from-disk")
        .save(dir.path().join("code.png"))
        .unwrap();

    let mut source = ImageDirSource::new(vec![dir.path().to_path_buf()]);
    let handle = source
        .open(DeviceSelector::Any, &StreamConstraints::default())
        .await
        .unwrap();
    let frame = source.current_frame(handle).unwrap();
    assert_eq!(
        QrDecoder::new().decode(&frame, &DecodeOptions::default()),
        Ok(Some("https://example.com/from-disk".to_string()))
    );
    assert!(classify("https://example.com/from-disk").is_link());
    source.close(handle);
}

#[tokio::test]
async fn test_image_dir_source_with_real_decoder_finds_nothing_in_blank_frames() {
    let dir = tempfile::tempdir().unwrap();
    image::GrayImage::from_pixel(64, 64, image::Luma([255u8]))
        .save(dir.path().join("blank.png"))
        .unwrap();

    let mut source = ImageDirSource::new(vec![dir.path().to_path_buf()]);
    let handle = source
        .open(DeviceSelector::Any, &StreamConstraints::default())
        .await
        .unwrap();
    let frame = source.current_frame(handle).unwrap();
    assert_eq!((frame.width, frame.height), (64, 64));
    assert_eq!(
        QrDecoder::new().decode(&frame, &DecodeOptions::default()),
        Ok(None)
    );
    source.close(handle);
}
