//! Session controller
//!
//! The controller is the only thing that drives a [`Session`]. It:
//! - Acquires the camera and runs analysis on the tokio runtime
//! - Applies completions through the session's stale-response guard
//! - Emits [`SessionEvent`]s so the UI knows to repaint
//!
//! State is read back through [`SharedSession`] snapshots; events carry no
//! data the UI must keep.

use super::state::{AnalysisRequest, SessionEvent, SessionSnapshot, SessionState, SharedSession};
use crate::analysis::{AnalysisResult, AnalysisService};
use crate::camera::{CameraLease, CameraProvider};
use crate::capture::CapturedImage;
use crate::config::SommelierConfig;
use crate::{Result, SommelierError};
use crossbeam_channel::{bounded, Receiver, Sender};
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Capacity of the event channel
const EVENT_BUFFER_SIZE: usize = 64;

/// Handle for driving a session from the UI or tests
///
/// Cloning is cheap; every clone drives the same session.
#[derive(Clone)]
pub struct SessionController {
    session: SharedSession,
    camera: Arc<dyn CameraProvider>,
    analyzer: Arc<dyn AnalysisService>,
    config: Arc<SommelierConfig>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
}

impl SessionController {
    /// Create a controller over a fresh idle session
    pub fn new(
        camera: Arc<dyn CameraProvider>,
        analyzer: Arc<dyn AnalysisService>,
        config: SommelierConfig,
    ) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_BUFFER_SIZE);
        let session = SharedSession::new();
        info!("[SESSION] Created session {}", session.read().id());

        Self {
            session,
            camera,
            analyzer,
            config: Arc::new(config),
            event_tx,
            event_rx,
        }
    }

    /// Ask for the camera
    ///
    /// Waits for the provider to grant or refuse access. Returns `true` if
    /// the outcome was applied to the session; `false` if the request was
    /// ignored (wrong state, already pending) or went stale.
    pub async fn request_camera(&self) -> bool {
        let ticket = self.session.write().begin_camera_acquisition();
        let Some(ticket) = ticket else {
            debug!(
                "[SESSION] Ignoring camera request in state {}",
                self.session.state()
            );
            return false;
        };

        let request = self.config.camera.request();
        info!(
            "[CAMERA] Requesting {} camera at {}",
            request.facing, request.resolution
        );

        // Acquisition runs to completion even after a reset so that a
        // late handle can be released rather than leaked.
        let outcome = self.camera.acquire(&request).await;
        if ticket.cancel.is_cancelled() {
            debug!("[CAMERA] Acquisition {} finished after reset", ticket.id);
        }

        let applied = match outcome {
            Ok(handle) => {
                info!(
                    "[CAMERA] Acquired {} at {}",
                    handle.label(),
                    handle.resolution()
                );
                let lease = CameraLease::new(self.camera.clone(), handle);
                self.session.write().camera_acquired(ticket.id, lease)
            }
            Err(e) => {
                warn!("[CAMERA] Acquisition failed: {}", e);
                self.session.write().camera_failed(ticket.id, &e)
            }
        };

        if applied {
            self.notify_state();
        } else {
            debug!("[CAMERA] Acquisition {} was stale, discarded", ticket.id);
        }
        applied
    }

    /// Snapshot the viewfinder and analyze it
    ///
    /// The frame is encoded off the session lock on the blocking pool. The
    /// camera is released before the analysis starts. Returns `true` if a
    /// result or error was applied to the session.
    pub async fn capture(&self) -> bool {
        let frame = self.session.read().capture_frame();
        let Some((device, frame)) = frame else {
            debug!(
                "[SESSION] Ignoring capture in state {}",
                self.session.state()
            );
            return false;
        };

        let quality = self.config.capture.jpeg_quality;
        let encoded = match frame {
            Ok(frame) => {
                tokio::task::spawn_blocking(move || CapturedImage::from_frame(&frame, quality))
                    .await
                    .unwrap_or_else(|e| {
                        Err(SommelierError::CaptureFailure(format!(
                            "encoder task failed: {}",
                            e
                        )))
                    })
            }
            Err(e) => Err(e),
        };

        let outcome = self.session.write().finish_capture(device, encoded);
        match outcome {
            None => {
                debug!("[CAMERA] Capture from device {} was stale, discarded", device);
                false
            }
            Some(Err(e)) => {
                error!("[CAMERA] Capture failed: {}", e);
                self.notify_state();
                true
            }
            Some(Ok(request)) => {
                info!(
                    "[CAMERA] Captured {} bytes, camera released",
                    request.image.len()
                );
                self.notify_state();
                self.run_analysis(request).await
            }
        }
    }

    /// Analyze an uploaded file
    ///
    /// The bytes are accepted as given; an undecodable payload ends in
    /// `Error`. Returns `true` if a result or error was applied.
    pub async fn select_file(&self, bytes: Vec<u8>) -> bool {
        let len = bytes.len();
        let request = self.session.write().select_file(bytes);
        let Some(request) = request else {
            debug!(
                "[SESSION] Ignoring file selection in state {}",
                self.session.state()
            );
            return false;
        };

        info!(
            "[SESSION] Analyzing uploaded file ({} bytes, {})",
            len,
            request.image.mime_type()
        );
        self.notify_state();
        self.run_analysis(request).await
    }

    async fn run_analysis(&self, request: AnalysisRequest) -> bool {
        let AnalysisRequest { ticket, image } = request;

        let outcome = tokio::select! {
            _ = ticket.cancel.cancelled() => {
                debug!("[ANALYSIS] Request {} cancelled", ticket.id);
                return false;
            }
            outcome = analyze_image(self.analyzer.as_ref(), &image) => outcome,
        };

        match &outcome {
            Ok(result) => info!(
                "[ANALYSIS] Request {} tasted \"{}\" ({}, {})",
                ticket.id, result.playlist_title, result.mood, result.intensity
            ),
            Err(e) => error!("[ANALYSIS] Request {} failed: {}", ticket.id, e),
        }

        let applied = self.session.write().finish_analysis(ticket.id, &outcome);
        if applied {
            self.notify_state();
        } else {
            debug!("[ANALYSIS] Request {} was stale, discarded", ticket.id);
        }
        applied
    }

    /// Return to `Idle`, releasing the camera and abandoning pending work
    pub fn reset(&self) {
        let previous = {
            let mut session = self.session.write();
            let previous = session.state();
            session.reset();
            previous
        };
        info!("[SESSION] Reset from {}", previous);
        self.notify_state();
    }

    /// Tear down the session; releases the camera if held
    pub fn shutdown(&self) {
        self.session.write().reset();
        info!("[SESSION] Shutdown");
        self.emit(SessionEvent::Shutdown);
    }

    /// Current frame of the active camera, for the viewfinder
    pub fn preview_frame(&self) -> Option<RgbImage> {
        let session = self.session.read();
        let lease = session.camera()?;
        match lease.capture_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("[CAMERA] Preview frame unavailable: {}", e);
                None
            }
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receiver for session events
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Get the shared session
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Get a snapshot of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Configuration the controller was built with
    pub fn config(&self) -> &SommelierConfig {
        &self.config
    }

    fn notify_state(&self) {
        let state = self.session.state();
        debug!("[SESSION] State is now {}", state);
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: SessionEvent) {
        // A full channel only means the UI has not drained it yet
        if self.event_tx.try_send(event).is_err() {
            debug!("[SESSION] Event channel full, dropping event");
        }
    }
}

/// Decode check, remote call and shape check as one fallible step
///
/// Every failure comes out as `AnalysisFailure`.
async fn analyze_image(
    analyzer: &dyn AnalysisService,
    image: &CapturedImage,
) -> Result<AnalysisResult> {
    let run = async {
        image.decode()?;
        let result = analyzer.analyze(image).await?;
        result.validate()?;
        Ok::<_, SommelierError>(result)
    };
    run.await.map_err(SommelierError::into_analysis_failure)
}
