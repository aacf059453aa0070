//! File-backed camera providers
//!
//! Desktop builds have no portable viewfinder, so the "device" is an image
//! file that is opened on acquire and served as the live frame until the
//! handle is released.

use super::{CameraHandle, CameraProvider, CameraRequest, Resolution};
use crate::{Result, SommelierError};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// How long an acquire waits for a previous holder to let go
pub const DEFAULT_RELEASE_GRACE: Duration = Duration::from_secs(2);

struct OpenDevice {
    id: u64,
    frame: RgbImage,
}

/// Camera that serves a still image file as its frame
///
/// Only one handle may be open at a time. An acquire that finds the device
/// held waits up to the release grace period before giving up, so a handle
/// that is about to be dropped does not turn into a refusal. A missing or
/// unreadable file is reported the same way a browser reports a refused
/// permission prompt.
pub struct StillImageCamera {
    source: PathBuf,
    next_id: AtomicU64,
    open: Mutex<Option<OpenDevice>>,
    released: Notify,
    release_grace: Duration,
}

impl StillImageCamera {
    /// Create a camera backed by the given image file
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            next_id: AtomicU64::new(1),
            open: Mutex::new(None),
            released: Notify::new(),
            release_grace: DEFAULT_RELEASE_GRACE,
        }
    }

    /// Set how long an acquire waits for the device to be released
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Path of the backing image
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Check if a handle is currently open
    pub fn is_open(&self) -> bool {
        self.open.lock().is_some()
    }

    fn label(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "still camera".to_string())
    }
}

/// Scale a frame down so it fits the requested resolution
///
/// Aspect ratio is preserved; frames already within bounds are untouched.
pub fn fit_within(frame: RgbImage, bounds: Resolution) -> RgbImage {
    let (width, height) = frame.dimensions();
    if width <= bounds.width && height <= bounds.height {
        return frame;
    }

    image::DynamicImage::ImageRgb8(frame)
        .resize(bounds.width, bounds.height, FilterType::Triangle)
        .to_rgb8()
}

#[async_trait]
impl CameraProvider for StillImageCamera {
    async fn acquire(&self, request: &CameraRequest) -> Result<CameraHandle> {
        debug!(
            "[CAMERA] Opening {} ({} facing, ideal {})",
            self.source.display(),
            request.facing,
            request.resolution
        );

        let bytes = tokio::fs::read(&self.source).await.map_err(|e| {
            SommelierError::PermissionDenied(format!(
                "cannot open {}: {}",
                self.source.display(),
                e
            ))
        })?;

        let bounds = request.resolution;
        let frame = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map(|img| fit_within(img.to_rgb8(), bounds))
        })
        .await
        .map_err(|e| SommelierError::PermissionDenied(format!("device task failed: {}", e)))?
        .map_err(|e| {
            SommelierError::PermissionDenied(format!("source is not a readable image: {}", e))
        })?;

        let deadline = tokio::time::Instant::now() + self.release_grace;
        loop {
            // Registered before checking so a release in between is not missed
            let released = self.released.notified();
            {
                let mut open = self.open.lock();
                if open.is_none() {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let resolution = Resolution::new(frame.width(), frame.height());
                    *open = Some(OpenDevice { id, frame });

                    info!(
                        "[CAMERA] Device {} open: {} at {}",
                        id,
                        self.label(),
                        resolution
                    );
                    return Ok(CameraHandle::new(id, resolution, self.label()));
                }
            }

            debug!("[CAMERA] Device busy, waiting for release");
            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return Err(SommelierError::PermissionDenied(
                    "device is already in use".to_string(),
                ));
            }
        }
    }

    fn capture_frame(&self, handle: &CameraHandle) -> Result<RgbImage> {
        match self.open.lock().as_ref() {
            Some(device) if device.id == handle.id() => Ok(device.frame.clone()),
            _ => Err(SommelierError::CaptureFailure(format!(
                "device {} is not open",
                handle.id()
            ))),
        }
    }

    fn release(&self, handle: CameraHandle) {
        let mut open = self.open.lock();
        match open.as_ref() {
            Some(device) if device.id == handle.id() => {
                *open = None;
                info!("[CAMERA] Device {} released", handle.id());
                self.released.notify_waiters();
            }
            _ => warn!("[CAMERA] Release of unknown device {}", handle.id()),
        }
    }
}

/// Camera for machines with no configured source; always refuses access
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCamera;

#[async_trait]
impl CameraProvider for UnavailableCamera {
    async fn acquire(&self, _request: &CameraRequest) -> Result<CameraHandle> {
        Err(SommelierError::PermissionDenied(
            "no camera source configured".to_string(),
        ))
    }

    fn capture_frame(&self, handle: &CameraHandle) -> Result<RgbImage> {
        Err(SommelierError::CaptureFailure(format!(
            "device {} is not open",
            handle.id()
        )))
    }

    fn release(&self, _handle: CameraHandle) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn write_frame(width: u32, height: u32) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        RgbImage::from_pixel(width, height, Rgb([40, 20, 80]))
            .save_with_format(file.path(), ImageFormat::Png)
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_acquire_capture_release() {
        let file = write_frame(32, 18);
        let camera = StillImageCamera::new(file.path());

        let handle = camera.acquire(&CameraRequest::default()).await.unwrap();
        assert!(camera.is_open());
        assert_eq!(handle.resolution(), Resolution::new(32, 18));

        let frame = camera.capture_frame(&handle).unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgb([40, 20, 80]));

        camera.release(handle);
        assert!(!camera.is_open());
    }

    #[tokio::test]
    async fn test_second_acquire_is_refused() {
        let file = write_frame(8, 8);
        let camera =
            StillImageCamera::new(file.path()).with_release_grace(Duration::from_millis(50));

        let _handle = camera.acquire(&CameraRequest::default()).await.unwrap();
        let second = camera.acquire(&CameraRequest::default()).await;
        assert!(matches!(second, Err(SommelierError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_acquire_waits_for_pending_release() {
        let file = write_frame(8, 8);
        let camera = std::sync::Arc::new(StillImageCamera::new(file.path()));

        let first = camera.acquire(&CameraRequest::default()).await.unwrap();
        let waiter = {
            let camera = camera.clone();
            tokio::spawn(async move { camera.acquire(&CameraRequest::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        camera.release(first);
        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.id(), 2);
        assert!(camera.is_open());
    }

    #[tokio::test]
    async fn test_missing_source_is_permission_denied() {
        let camera = StillImageCamera::new("/no/such/frame.jpg");
        let result = camera.acquire(&CameraRequest::default()).await;
        assert!(matches!(result, Err(SommelierError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_capture_after_release_fails() {
        let file = write_frame(8, 8);
        let camera = StillImageCamera::new(file.path());

        let handle = camera.acquire(&CameraRequest::default()).await.unwrap();
        let stale = CameraHandle::new(handle.id(), handle.resolution(), "stale");
        camera.release(handle);

        assert!(matches!(
            camera.capture_frame(&stale),
            Err(SommelierError::CaptureFailure(_))
        ));
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let frame = RgbImage::new(2560, 1440);
        let fitted = fit_within(frame, Resolution::new(1280, 720));
        assert_eq!(fitted.dimensions(), (1280, 720));

        let small = RgbImage::new(100, 50);
        assert_eq!(
            fit_within(small, Resolution::new(1280, 720)).dimensions(),
            (100, 50)
        );
    }

    #[tokio::test]
    async fn test_unavailable_camera_denies() {
        let result = UnavailableCamera.acquire(&CameraRequest::default()).await;
        assert!(matches!(result, Err(SommelierError::PermissionDenied(_))));
    }
}
