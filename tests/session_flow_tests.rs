//! End-to-end session flows against mock providers
//!
//! These tests drive the controller the way the UI does and check the
//! per-state field rules, camera release accounting and the stale-response
//! guard.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use vibe_sommelier::analysis::{AnalysisResult, AnalysisService};
use vibe_sommelier::camera::{CameraHandle, CameraProvider, CameraRequest, StillImageCamera};
use vibe_sommelier::capture::{CapturedImage, ImageOrigin};
use vibe_sommelier::{
    ErrorKind, Result, SessionController, SessionState, SommelierConfig, SommelierError,
};

/// Camera that counts acquisitions and releases
#[derive(Default)]
struct MockCamera {
    deny: bool,
    acquired: AtomicUsize,
    released: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockCamera {
    fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn outstanding(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraProvider for MockCamera {
    async fn acquire(&self, request: &CameraRequest) -> Result<CameraHandle> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.deny {
            return Err(SommelierError::PermissionDenied("NotAllowedError".into()));
        }
        let id = self.acquired.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(CameraHandle::new(id, request.resolution, "mock"))
    }

    fn capture_frame(&self, _handle: &CameraHandle) -> Result<RgbImage> {
        Ok(RgbImage::from_pixel(64, 36, Rgb([90, 60, 30])))
    }

    fn release(&self, _handle: CameraHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Analyzer that returns a fixed outcome, optionally after a gate opens
struct MockAnalyzer {
    outcome: Result<AnalysisResult>,
    calls: AtomicUsize,
    seen: parking_lot::Mutex<Vec<CapturedImage>>,
    gate: Option<Arc<Notify>>,
}

impl MockAnalyzer {
    fn returning(outcome: Result<AnalysisResult>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            seen: parking_lot::Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(outcome: Result<AnalysisResult>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::returning(outcome)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for MockAnalyzer {
    async fn analyze(&self, image: &CapturedImage) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(image.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

fn tasting() -> AnalysisResult {
    AnalysisResult {
        playlist_title: "Fog on the Harbour".into(),
        note: "Grey-blue restraint with a brass finish.".into(),
        color_palette: vec![
            "#8d99ae".into(),
            "#2b2d42".into(),
            "#edf2f4".into(),
            "#ef233c".into(),
            "#d90429".into(),
        ],
        genres: vec!["post-rock".into(), "ambient".into(), "shoegaze".into()],
        mood: "Pensive".into(),
        intensity: "Low".into(),
    }
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([10, 200, 120])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn controller(camera: Arc<MockCamera>, analyzer: Arc<MockAnalyzer>) -> SessionController {
    SessionController::new(camera, analyzer, SommelierConfig::default())
}

fn assert_consistent(controller: &SessionController) {
    if let Err(reason) = controller.session().read().check_invariants() {
        panic!("session inconsistent: {}", reason);
    }
}

#[tokio::test]
async fn test_camera_capture_reaches_result() {
    let camera = Arc::new(MockCamera::default());
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = controller(camera.clone(), analyzer.clone());

    controller.request_camera().await;
    assert_eq!(controller.state(), SessionState::CameraActive);
    assert_consistent(&controller);

    controller.capture().await;
    assert_eq!(controller.state(), SessionState::Result);
    assert_consistent(&controller);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.analysis, Some(tasting()));
    let image = snapshot.captured_image.unwrap();
    assert_eq!(image.origin(), ImageOrigin::Camera);
    assert_eq!(image.mime_type(), "image/jpeg");

    assert_eq!(analyzer.calls(), 1);
    assert_eq!(camera.outstanding(), 0);
}

#[tokio::test]
async fn test_upload_result_keeps_exact_bytes() {
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = controller(Arc::new(MockCamera::default()), analyzer.clone());
    let bytes = png_bytes();

    controller.select_file(bytes.clone()).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Result);
    assert_eq!(snapshot.analysis, Some(tasting()));
    assert_eq!(snapshot.captured_image.unwrap().bytes(), bytes.as_slice());
    assert_eq!(analyzer.seen.lock()[0].bytes(), bytes.as_slice());
    assert_consistent(&controller);
}

#[tokio::test]
async fn test_release_once_per_acquire_on_every_path() {
    let camera = Arc::new(MockCamera::default());
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));

    // capture path
    let first = controller(camera.clone(), analyzer.clone());
    first.request_camera().await;
    first.capture().await;
    assert_eq!(camera.outstanding(), 0);

    // reset path
    let second = controller(camera.clone(), analyzer.clone());
    second.request_camera().await;
    second.reset();
    assert_eq!(camera.outstanding(), 0);

    // teardown path
    {
        let third = controller(camera.clone(), analyzer.clone());
        third.request_camera().await;
        assert_eq!(camera.outstanding(), 1);
    }
    assert_eq!(camera.outstanding(), 0);

    assert_eq!(camera.acquired.load(Ordering::SeqCst), 3);
    assert_eq!(camera.released.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_loading_rejects_new_input() {
    let gate = Arc::new(Notify::new());
    let analyzer = Arc::new(MockAnalyzer::gated(Ok(tasting()), gate.clone()));
    let camera = Arc::new(MockCamera::default());
    let controller = controller(camera.clone(), analyzer.clone());

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.select_file(png_bytes()).await })
    };
    while analyzer.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(controller.state(), SessionState::Loading);

    assert!(!controller.select_file(vec![1, 2, 3]).await);
    assert!(!controller.capture().await);
    assert!(!controller.request_camera().await);
    assert_consistent(&controller);

    gate.notify_one();
    assert!(task.await.unwrap());

    assert_eq!(analyzer.calls(), 1);
    assert_eq!(camera.acquired.load(Ordering::SeqCst), 0);
    assert_eq!(controller.state(), SessionState::Result);
}

#[tokio::test]
async fn test_service_failure_reaches_error() {
    let analyzer = Arc::new(MockAnalyzer::returning(Err(SommelierError::AnalysisFailure(
        "HTTP 500: INTERNAL".into(),
    ))));
    let controller = controller(Arc::new(MockCamera::default()), analyzer);

    controller.select_file(png_bytes()).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Error);
    assert!(snapshot.analysis.is_none());
    let message = snapshot.error_message().unwrap();
    assert!(!message.is_empty());
    assert!(!message.contains("500"));
    assert_consistent(&controller);
}

#[tokio::test]
async fn test_malformed_result_reaches_error() {
    let mut malformed = tasting();
    malformed.genres = vec!["only one".into()];
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(malformed)));
    let controller = controller(Arc::new(MockCamera::default()), analyzer);

    controller.select_file(png_bytes()).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Error);
    assert_eq!(snapshot.error.unwrap().kind, ErrorKind::AnalysisFailure);
    assert!(snapshot.analysis.is_none());
}

#[tokio::test]
async fn test_camera_denied_then_reset() {
    let camera = Arc::new(MockCamera::denying());
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = controller(camera.clone(), analyzer);

    controller.request_camera().await;
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Error);
    assert!(snapshot
        .error_message()
        .unwrap()
        .to_lowercase()
        .contains("camera"));
    assert_consistent(&controller);

    controller.reset();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.captured_image.is_none());
    assert!(snapshot.analysis.is_none());
    assert!(snapshot.error.is_none());
    assert!(!snapshot.camera_active());
    assert_eq!(camera.outstanding(), 0);
}

#[tokio::test]
async fn test_late_result_after_reset_is_discarded() {
    let gate = Arc::new(Notify::new());
    let analyzer = Arc::new(MockAnalyzer::gated(Ok(tasting()), gate.clone()));
    let controller = controller(Arc::new(MockCamera::default()), analyzer.clone());

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.select_file(png_bytes()).await })
    };
    while analyzer.calls() == 0 {
        tokio::task::yield_now().await;
    }

    controller.reset();
    gate.notify_one();
    assert!(!task.await.unwrap());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.analysis.is_none());
    assert!(snapshot.captured_image.is_none());
    assert_consistent(&controller);
}

#[tokio::test]
async fn test_late_camera_handle_is_released() {
    let gate = Arc::new(Notify::new());
    let camera = Arc::new(MockCamera::gated(gate.clone()));
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = controller(camera.clone(), analyzer);

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_camera().await })
    };
    while !controller.session().read().is_busy() {
        tokio::task::yield_now().await;
    }

    controller.reset();
    gate.notify_one();
    assert!(!task.await.unwrap());

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(camera.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(camera.outstanding(), 0);
}

#[tokio::test]
async fn test_still_image_camera_end_to_end() {
    let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    std::fs::write(file.path(), png_bytes()).unwrap();

    let camera = Arc::new(StillImageCamera::new(file.path()));
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = SessionController::new(camera.clone(), analyzer, SommelierConfig::default());

    controller.request_camera().await;
    assert!(camera.is_open());
    assert_eq!(controller.snapshot().camera_resolution.unwrap().width, 12);

    controller.capture().await;
    assert!(!camera.is_open());
    assert_eq!(controller.state(), SessionState::Result);
}

#[tokio::test]
async fn test_new_request_waits_out_a_late_still_handle() {
    let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    std::fs::write(file.path(), png_bytes()).unwrap();

    let camera = Arc::new(StillImageCamera::new(file.path()));
    let analyzer = Arc::new(MockAnalyzer::returning(Ok(tasting())));
    let controller = SessionController::new(camera.clone(), analyzer, SommelierConfig::default());

    // A handle from an acquisition abandoned by reset, not yet dropped
    let late = camera.acquire(&CameraRequest::default()).await.unwrap();

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_camera().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    camera.release(late);

    assert!(task.await.unwrap());
    assert_eq!(controller.state(), SessionState::CameraActive);
    assert!(controller.snapshot().error.is_none());
    assert_consistent(&controller);
}

#[derive(Clone, Copy, Debug)]
enum Trigger {
    RequestCamera,
    Capture,
    SelectImage,
    SelectGarbage,
    Reset,
}

const TRIGGERS: [Trigger; 5] = [
    Trigger::RequestCamera,
    Trigger::Capture,
    Trigger::SelectImage,
    Trigger::SelectGarbage,
    Trigger::Reset,
];

const SEQUENCE_LEN: u32 = 4;

async fn apply(controller: &SessionController, trigger: Trigger) {
    match trigger {
        Trigger::RequestCamera => {
            controller.request_camera().await;
        }
        Trigger::Capture => {
            controller.capture().await;
        }
        Trigger::SelectImage => {
            controller.select_file(png_bytes()).await;
        }
        Trigger::SelectGarbage => {
            controller.select_file(b"not an image".to_vec()).await;
        }
        Trigger::Reset => controller.reset(),
    }
}

#[tokio::test]
async fn test_invariants_hold_across_trigger_sequences() {
    let outcomes = [
        Ok(tasting()),
        Err(SommelierError::AnalysisFailure("HTTP 500".into())),
    ];
    let count = TRIGGERS.len().pow(SEQUENCE_LEN);

    for deny in [false, true] {
        for outcome in &outcomes {
            for index in 0..count {
                let sequence: Vec<Trigger> = (0..SEQUENCE_LEN)
                    .map(|step| TRIGGERS[index / TRIGGERS.len().pow(step) % TRIGGERS.len()])
                    .collect();

                let camera = Arc::new(if deny {
                    MockCamera::denying()
                } else {
                    MockCamera::default()
                });
                let analyzer = Arc::new(MockAnalyzer::returning(outcome.clone()));
                let controller = controller(camera.clone(), analyzer);

                for (step, trigger) in sequence.iter().enumerate() {
                    apply(&controller, *trigger).await;

                    if let Err(reason) = controller.session().read().check_invariants() {
                        panic!("{:?} after step {}: {}", sequence, step, reason);
                    }
                    assert!(
                        !controller.session().read().is_busy(),
                        "{:?} left work pending after step {}",
                        sequence,
                        step
                    );
                    let held = usize::from(controller.state().is_camera_active());
                    assert_eq!(
                        camera.outstanding(),
                        held,
                        "{:?} camera count after step {}",
                        sequence,
                        step
                    );
                }

                drop(controller);
                assert_eq!(camera.outstanding(), 0, "{:?} leaked the camera", sequence);
            }
        }
    }
}
