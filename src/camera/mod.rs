//! Camera device access
//!
//! The session never talks to a platform camera directly. It is handed a
//! [`CameraProvider`] and holds at most one [`CameraLease`], which gives the
//! device back to the provider when it is released or dropped.

pub mod still;

pub use still::{StillImageCamera, UnavailableCamera};

use crate::Result;
use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Frame dimensions in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the requested camera faces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointed at the scene
    #[default]
    Environment,
    /// Front camera, pointed at the user
    User,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Environment => write!(f, "environment"),
            Facing::User => write!(f, "user"),
        }
    }
}

/// Parameters for acquiring a camera stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraRequest {
    /// Ideal resolution; providers may deliver something smaller
    pub resolution: Resolution,
    pub facing: Facing,
}

/// Opaque handle to an open camera device
///
/// Not `Clone`: whoever holds the handle owns the device.
#[derive(Debug, PartialEq, Eq)]
pub struct CameraHandle {
    id: u64,
    resolution: Resolution,
    label: String,
}

impl CameraHandle {
    /// Create a handle; called by providers when a device is opened
    pub fn new(id: u64, resolution: Resolution, label: impl Into<String>) -> Self {
        Self {
            id,
            resolution,
            label: label.into(),
        }
    }

    /// Provider-assigned identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolution the device actually delivers
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Human-readable device name
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Platform camera capability
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Open a device, waiting for the platform to resolve permission
    ///
    /// # Errors
    /// `PermissionDenied` when the user or platform refuses access.
    async fn acquire(&self, request: &CameraRequest) -> Result<CameraHandle>;

    /// Read the current frame from an open device
    fn capture_frame(&self, handle: &CameraHandle) -> Result<RgbImage>;

    /// Close the device; never fails
    fn release(&self, handle: CameraHandle);
}

/// Exclusive, scoped ownership of an open camera
///
/// The device is released exactly once: either through [`CameraLease::release`]
/// or when the lease is dropped.
pub struct CameraLease {
    provider: Arc<dyn CameraProvider>,
    handle: Option<CameraHandle>,
}

impl CameraLease {
    /// Wrap a freshly acquired handle
    pub fn new(provider: Arc<dyn CameraProvider>, handle: CameraHandle) -> Self {
        Self {
            provider,
            handle: Some(handle),
        }
    }

    /// Borrow the underlying handle
    pub fn handle(&self) -> Option<&CameraHandle> {
        self.handle.as_ref()
    }

    /// Read the current frame
    pub fn capture_frame(&self) -> Result<RgbImage> {
        match self.handle.as_ref() {
            Some(handle) => self.provider.capture_frame(handle),
            None => Err(crate::SommelierError::CaptureFailure(
                "camera lease already released".to_string(),
            )),
        }
    }

    /// Release the device now
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("[CAMERA] Releasing device {} ({})", handle.id(), handle.label());
            self.provider.release(handle);
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraLease")
            .field("handle", &self.handle)
            .finish()
    }
}
