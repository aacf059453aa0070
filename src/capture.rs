//! Captured image payloads
//!
//! A [`CapturedImage`] is what the session hands to the analysis service:
//! either a JPEG-encoded camera still or the raw bytes of an uploaded file.

use crate::{Result, SommelierError};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::sync::Arc;

/// MIME type used when an upload's format cannot be sniffed
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Where a captured image came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Still frame from an active camera
    Camera,
    /// File chosen by the user
    Upload,
}

/// Opaque image payload owned by a session
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    mime_type: String,
    origin: ImageOrigin,
}

impl CapturedImage {
    /// Encode a camera frame as JPEG
    ///
    /// `quality` is a factor in (0, 1], mapped onto the encoder's 1..=100 scale.
    pub fn from_frame(frame: &RgbImage, quality: f32) -> Result<Self> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality));
        encoder
            .write_image(
                frame.as_raw(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| SommelierError::CaptureFailure(format!("JPEG encoding failed: {}", e)))?;

        Ok(Self {
            bytes: bytes.into(),
            mime_type: "image/jpeg".to_string(),
            origin: ImageOrigin::Camera,
        })
    }

    /// Wrap the raw bytes of an uploaded file
    ///
    /// Nothing is validated here; a payload that is not an image surfaces
    /// later as an analysis failure.
    pub fn from_upload(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        let mime_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| UNKNOWN_MIME.to_string());

        Self {
            bytes: bytes.into(),
            mime_type,
            origin: ImageOrigin::Upload,
        }
    }

    /// Raw encoded bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type of the encoded bytes
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Where the image came from
    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check if both values share the same payload allocation
    pub fn same_payload(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Base64 encoding of the payload
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    /// `data:` URL for the payload
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Decode the payload into pixels
    ///
    /// # Errors
    /// `AnalysisFailure` if the bytes are not a supported image.
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.bytes)
            .map_err(|e| SommelierError::AnalysisFailure(format!("image does not decode: {}", e)))
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("origin", &self.origin)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Map a (0, 1] quality factor to the JPEG encoder scale
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
