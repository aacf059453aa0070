//! Session state for one capture-and-taste interaction
//!
//! This module provides the session data and its transitions:
//! - **Controller**: drives transitions and runs the async work
//! - **UI**: reads snapshots for rendering
//! - **TestRunner**: reads snapshots for assertions
//!
//! Every transition is a method on [`Session`] and is applied under a single
//! write lock, so the per-state field rules hold whenever the lock is free.

use crate::analysis::AnalysisResult;
use crate::camera::{CameraHandle, CameraLease, Resolution};
use crate::capture::CapturedImage;
use crate::error::ErrorKind;
use crate::SommelierError;
use image::RgbImage;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where a session is in its flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to pick camera or upload
    #[default]
    Idle,
    /// Camera is open and showing the viewfinder
    CameraActive,
    /// Analysis request in flight
    Loading,
    /// Tasting note available
    Result,
    /// Something failed; message available
    Error,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_camera_active(&self) -> bool {
        matches!(self, SessionState::CameraActive)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_result(&self) -> bool {
        matches!(self, SessionState::Result)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionState::Error)
    }

    /// Lowercase name used in logs and scenario files
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::CameraActive => "camera_active",
            SessionState::Loading => "loading",
            SessionState::Result => "result",
            SessionState::Error => "error",
        }
    }

    /// Parse a name produced by [`SessionState::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(SessionState::Idle),
            "camera_active" | "camera" => Some(SessionState::CameraActive),
            "loading" => Some(SessionState::Loading),
            "result" => Some(SessionState::Result),
            "error" => Some(SessionState::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::CameraActive => write!(f, "CameraActive"),
            SessionState::Loading => write!(f, "Loading"),
            SessionState::Result => write!(f, "Result"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// User-facing error plus the kind that caused it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn from_error(error: &SommelierError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

/// Kind of asynchronous work a session can wait on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    CameraAcquisition,
    Analysis,
}

#[derive(Debug)]
struct PendingOperation {
    id: u64,
    kind: OperationKind,
    cancel: CancellationToken,
}

/// Identity of an in-flight operation, handed to whoever runs it
#[derive(Clone, Debug)]
pub struct OperationTicket {
    pub id: u64,
    pub cancel: CancellationToken,
}

/// Everything needed to run one analysis request
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub ticket: OperationTicket,
    pub image: CapturedImage,
}

/// One interaction session
///
/// Holds the camera lease exclusively; dropping the session releases it.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: SessionState,
    captured_image: Option<CapturedImage>,
    analysis: Option<AnalysisResult>,
    error: Option<SessionError>,
    camera: Option<CameraLease>,
    pending: Option<PendingOperation>,
    next_operation_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new idle session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            captured_image: None,
            analysis: None,
            error: None,
            camera: None,
            pending: None,
            next_operation_id: 1,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured_image.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Handle of the open camera, if any
    pub fn camera_handle(&self) -> Option<&CameraHandle> {
        self.camera.as_ref().and_then(|lease| lease.handle())
    }

    /// Borrow the camera lease (for previews)
    pub fn camera(&self) -> Option<&CameraLease> {
        self.camera.as_ref()
    }

    /// Kind of operation in flight, if any
    pub fn pending_operation(&self) -> Option<OperationKind> {
        self.pending.as_ref().map(|op| op.kind)
    }

    /// Check if the session is waiting on async work
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    // === Transitions ===

    fn start_operation(&mut self, kind: OperationKind) -> OperationTicket {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        let cancel = CancellationToken::new();
        self.pending = Some(PendingOperation {
            id,
            kind,
            cancel: cancel.clone(),
        });
        OperationTicket { id, cancel }
    }

    fn is_current(&self, id: u64, kind: OperationKind) -> bool {
        self.pending
            .as_ref()
            .map(|op| op.id == id && op.kind == kind)
            .unwrap_or(false)
    }

    /// Start acquiring a camera
    ///
    /// Returns `None` unless the session is idle with nothing in flight;
    /// in particular a second request while a camera is open or being
    /// opened is ignored.
    pub fn begin_camera_acquisition(&mut self) -> Option<OperationTicket> {
        if !self.state.is_idle() || self.pending.is_some() || self.camera.is_some() {
            return None;
        }
        Some(self.start_operation(OperationKind::CameraAcquisition))
    }

    /// Apply a successful acquisition
    ///
    /// If the acquisition is stale (reset in the meantime) the lease is
    /// dropped here, releasing the device, and `false` is returned.
    pub fn camera_acquired(&mut self, operation: u64, lease: CameraLease) -> bool {
        if !self.state.is_idle() || !self.is_current(operation, OperationKind::CameraAcquisition) {
            drop(lease);
            return false;
        }
        self.pending = None;
        self.camera = Some(lease);
        self.state = SessionState::CameraActive;
        true
    }

    /// Apply a failed acquisition
    pub fn camera_failed(&mut self, operation: u64, error: &SommelierError) -> bool {
        if !self.state.is_idle() || !self.is_current(operation, OperationKind::CameraAcquisition) {
            return false;
        }
        self.fail(error);
        true
    }

    /// Read the current camera frame for a still capture
    ///
    /// Returns the device id with the frame, or `None` if the session is not
    /// in `CameraActive`. The camera stays open; encoding happens outside
    /// the session lock and is applied with [`Session::finish_capture`].
    pub fn capture_frame(&self) -> Option<(u64, Result<RgbImage, SommelierError>)> {
        if !self.state.is_camera_active() {
            return None;
        }
        let lease = self.camera.as_ref()?;
        let device = lease.handle()?.id();
        Some((device, lease.capture_frame()))
    }

    /// Apply an encoded still and start analysis
    ///
    /// The camera is released whatever the outcome. Returns `None` if the
    /// session has moved on (reset, or another capture already applied) or
    /// now holds a different device.
    pub fn finish_capture(
        &mut self,
        device: u64,
        encoded: Result<CapturedImage, SommelierError>,
    ) -> Option<Result<AnalysisRequest, SommelierError>> {
        if !self.state.is_camera_active() || self.camera_handle()?.id() != device {
            return None;
        }
        if let Some(lease) = self.camera.take() {
            lease.release();
        }

        match encoded {
            Ok(image) => Some(Ok(self.begin_analysis(image))),
            Err(e) => {
                self.fail(&e);
                Some(Err(e))
            }
        }
    }

    /// Take an uploaded file and start analysis
    ///
    /// Returns `None` unless the session is idle with nothing in flight.
    pub fn select_file(&mut self, bytes: Vec<u8>) -> Option<AnalysisRequest> {
        if !self.state.is_idle() || self.pending.is_some() {
            return None;
        }
        Some(self.begin_analysis(CapturedImage::from_upload(bytes)))
    }

    fn begin_analysis(&mut self, image: CapturedImage) -> AnalysisRequest {
        self.camera = None;
        self.analysis = None;
        self.error = None;
        self.captured_image = Some(image.clone());
        self.state = SessionState::Loading;
        let ticket = self.start_operation(OperationKind::Analysis);
        AnalysisRequest { ticket, image }
    }

    /// Apply the outcome of an analysis request
    ///
    /// Ignored (returns `false`) unless the session is still `Loading` for
    /// this same request.
    pub fn finish_analysis(
        &mut self,
        operation: u64,
        outcome: &Result<AnalysisResult, SommelierError>,
    ) -> bool {
        if !self.state.is_loading() || !self.is_current(operation, OperationKind::Analysis) {
            return false;
        }

        match outcome {
            Ok(result) => {
                self.pending = None;
                self.analysis = Some(result.clone());
                self.state = SessionState::Result;
            }
            Err(e) => self.fail(e),
        }
        true
    }

    fn fail(&mut self, error: &SommelierError) {
        self.camera = None;
        self.analysis = None;
        self.pending = None;
        self.error = Some(SessionError::from_error(error));
        self.state = SessionState::Error;
    }

    /// Return to `Idle` from any state
    ///
    /// Releases the camera, cancels whatever is in flight and clears every
    /// optional field.
    pub fn reset(&mut self) {
        if let Some(op) = self.pending.take() {
            op.cancel.cancel();
        }
        self.camera = None;
        self.captured_image = None;
        self.analysis = None;
        self.error = None;
        self.state = SessionState::Idle;
    }

    /// Create an immutable snapshot of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        let handle = self.camera_handle();
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            captured_image: self.captured_image.clone(),
            analysis: self.analysis.clone(),
            error: self.error.clone(),
            camera_label: handle.map(|h| h.label().to_string()),
            camera_resolution: handle.map(|h| h.resolution()),
            pending: self.pending_operation(),
        }
    }

    /// Verify the per-state field rules
    pub fn check_invariants(&self) -> Result<(), String> {
        let has_image = self.captured_image.is_some();
        let has_analysis = self.analysis.is_some();
        let has_error = self.error.is_some();
        let has_camera = self.camera.is_some();

        if has_camera != self.state.is_camera_active() {
            return Err(format!(
                "camera held = {} in state {}",
                has_camera, self.state
            ));
        }

        let ok = match self.state {
            SessionState::Idle => !has_image && !has_analysis && !has_error,
            SessionState::CameraActive => !has_image && !has_analysis && !has_error,
            SessionState::Loading => has_image && !has_analysis && !has_error,
            SessionState::Result => has_image && has_analysis && !has_error,
            SessionState::Error => !has_analysis && has_error,
        };
        if !ok {
            return Err(format!(
                "state {} has image={} analysis={} error={}",
                self.state, has_image, has_analysis, has_error
            ));
        }

        let analysis_pending = self.pending_operation() == Some(OperationKind::Analysis);
        if analysis_pending != self.state.is_loading() {
            return Err(format!(
                "analysis pending = {} in state {}",
                analysis_pending, self.state
            ));
        }

        Ok(())
    }
}

/// Immutable snapshot of a session
///
/// Used for rendering and assertions without holding locks.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub captured_image: Option<CapturedImage>,
    pub analysis: Option<AnalysisResult>,
    pub error: Option<SessionError>,
    pub camera_label: Option<String>,
    pub camera_resolution: Option<Resolution>,
    pub pending: Option<OperationKind>,
}

impl SessionSnapshot {
    /// Check if a camera handle was held when the snapshot was taken
    pub fn camera_active(&self) -> bool {
        self.camera_label.is_some()
    }

    /// User-facing error message, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Thread-safe shared session
///
/// This wraps `Session` in `Arc<RwLock<>>` so the UI thread and async
/// completions can both reach it. Never hold a guard across `.await`.
#[derive(Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl SharedSession {
    /// Create a new shared session
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a read lock on the session
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Session> {
        self.inner.read()
    }

    /// Get a write lock on the session
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Session> {
        self.inner.write()
    }

    /// Get a snapshot of the current session (no lock held after return)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.inner.read().state()
    }

    /// Check if an analysis is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.read().state().is_loading()
    }

    /// Check if a camera is held
    pub fn is_camera_active(&self) -> bool {
        self.inner.read().state().is_camera_active()
    }
}

/// Events emitted by the session controller
///
/// Used to wake the UI. The current state should be read from the
/// snapshot rather than reconstructed from events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// State has changed (trigger repaint)
    StateChanged(SessionState),
    /// Controller shut down; camera released
    Shutdown,
}
