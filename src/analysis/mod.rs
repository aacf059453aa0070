//! Aesthetic analysis of captured images
//!
//! This module defines the structured result the remote model returns and
//! the [`AnalysisService`] seam the session calls through.

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiAnalysisService;

use crate::capture::CapturedImage;
use crate::{Result, SommelierError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Number of swatches in a palette
pub const PALETTE_SIZE: usize = 5;

/// Number of suggested genres
pub const GENRE_COUNT: usize = 3;

/// Structured tasting note for one image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Playlist name that fits the aesthetic
    #[serde(alias = "playlistName")]
    pub playlist_title: String,

    /// Free-text tasting note
    #[serde(alias = "tastingNotes")]
    pub note: String,

    /// Dominant colors, left-to-right display order
    pub color_palette: Vec<String>,

    /// Matching music genres
    pub genres: Vec<String>,

    pub mood: String,

    pub intensity: String,
}

impl AnalysisResult {
    /// Minimal shape check on a decoded result
    ///
    /// Only counts and presence are checked; colour strings and prose are
    /// taken as given.
    pub fn validate(&self) -> Result<()> {
        if self.playlist_title.trim().is_empty() {
            return Err(SommelierError::AnalysisFailure(
                "result has an empty playlist title".to_string(),
            ));
        }

        if self.color_palette.len() != PALETTE_SIZE {
            return Err(SommelierError::AnalysisFailure(format!(
                "expected {} palette colors, got {}",
                PALETTE_SIZE,
                self.color_palette.len()
            )));
        }

        if self.genres.len() != GENRE_COUNT {
            return Err(SommelierError::AnalysisFailure(format!(
                "expected {} genres, got {}",
                GENRE_COUNT,
                self.genres.len()
            )));
        }

        Ok(())
    }

    /// Parse and shape-check a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        let result: AnalysisResult = serde_json::from_str(text).map_err(|e| {
            SommelierError::AnalysisFailure(format!("response is not a valid analysis: {}", e))
        })?;
        result.validate()?;
        Ok(result)
    }
}

/// Remote inference capability
///
/// Implementations make a single best-effort call; retries are left to the
/// user.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Describe the aesthetic of an image
    ///
    /// # Errors
    /// Any failure, including malformed responses, as `AnalysisFailure`.
    async fn analyze(&self, image: &CapturedImage) -> Result<AnalysisResult>;
}

/// Service used when no backend is configured; every call fails
#[derive(Clone, Debug)]
pub struct UnavailableAnalysis {
    reason: String,
}

impl UnavailableAnalysis {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AnalysisService for UnavailableAnalysis {
    async fn analyze(&self, _image: &CapturedImage) -> Result<AnalysisResult> {
        Err(SommelierError::AnalysisFailure(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_analysis_fails() {
        let service = UnavailableAnalysis::new("no API key configured");
        let image = CapturedImage::from_upload(vec![1, 2, 3]);
        let err = service.analyze(&image).await.unwrap_err();
        assert!(matches!(err, SommelierError::AnalysisFailure(ref m) if m.contains("API key")));
    }

    fn sample_json() -> &'static str {
        r##"{
            "playlistTitle": "Midnight Haze",
            "note": "Smoke and neon over wet asphalt.",
            "colorPalette": ["#1a1a2e", "#16213e", "#0f3460", "#533483", "#e94560"],
            "genres": ["ambient", "downtempo", "lo-fi"],
            "mood": "Mellow",
            "intensity": "Low"
        }"##
    }

    #[test]
    fn test_parse_valid_result() {
        let result = AnalysisResult::from_json(sample_json()).unwrap();
        assert_eq!(result.playlist_title, "Midnight Haze");
        assert_eq!(result.color_palette[4], "#e94560");
        assert_eq!(result.genres, vec!["ambient", "downtempo", "lo-fi"]);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let json = r##"{
            "playlistName": "Golden Hour",
            "tastingNotes": "Warm light.",
            "colorPalette": ["#1", "#2", "#3", "#4", "#5"],
            "genres": ["soul", "jazz", "funk"],
            "mood": "Warm",
            "intensity": "Medium"
        }"##;
        let result = AnalysisResult::from_json(json).unwrap();
        assert_eq!(result.playlist_title, "Golden Hour");
        assert_eq!(result.note, "Warm light.");
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = AnalysisResult::from_json(sample_json()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("playlistTitle").is_some());
        assert!(value.get("colorPalette").is_some());
    }

    #[test]
    fn test_missing_field_is_failure() {
        let json = r#"{"playlistTitle": "x", "note": "y"}"#;
        assert!(matches!(
            AnalysisResult::from_json(json),
            Err(SommelierError::AnalysisFailure(_))
        ));
    }

    #[test]
    fn test_wrong_palette_size_is_failure() {
        let json = r##"{
            "playlistTitle": "Short",
            "note": "n",
            "colorPalette": ["#000000"],
            "genres": ["a", "b", "c"],
            "mood": "m",
            "intensity": "i"
        }"##;
        let err = AnalysisResult::from_json(json).unwrap_err();
        assert!(err.to_string().contains("palette"));
    }

    #[test]
    fn test_wrong_genre_count_is_failure() {
        let mut result = AnalysisResult::from_json(sample_json()).unwrap();
        result.genres.pop();
        assert!(result.validate().is_err());
    }
}
