//! Configuration for the Vibe Sommelier
//!
//! Settings come from three layers, each overriding the previous one:
//! built-in defaults, an optional TOML file, and the environment (API key).

use crate::camera::{CameraRequest, Facing, Resolution};
use crate::{Result, SommelierError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default multimodal model used for the tasting
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Default REST endpoint for the model family
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables consulted for the API key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Configuration for the remote analysis service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// API key sent with every request (empty = unset)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Base URL of the model endpoints
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    /// Create a new analysis configuration with the specified key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Check whether an API key has been provided
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Camera device preferences
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Image file served as the viewfinder frame (no file = no camera)
    pub source: Option<PathBuf>,

    /// Ideal frame width
    pub width: u32,

    /// Ideal frame height
    pub height: u32,

    /// Which way the camera should face
    pub facing: Facing,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: None,
            width: 1280,
            height: 720,
            facing: Facing::Environment,
        }
    }
}

impl CameraConfig {
    /// Set the still-frame source
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the preferred resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the preferred facing
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Build the acquisition request handed to the camera provider
    pub fn request(&self) -> CameraRequest {
        CameraRequest {
            resolution: Resolution::new(self.width, self.height),
            facing: self.facing,
        }
    }
}

/// Still capture settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Lossy encoding quality factor in (0, 1]
    pub jpeg_quality: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { jpeg_quality: 0.85 }
    }
}

impl CaptureConfig {
    /// Set the quality factor
    pub fn with_jpeg_quality(mut self, quality: f32) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SommelierConfig {
    pub analysis: AnalysisConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
}

impl SommelierConfig {
    /// Default location of the config file
    ///
    /// `<config dir>/vibe-sommelier/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vibe-sommelier").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SommelierError::ConfigError(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            SommelierError::ConfigError(msg) => {
                SommelierError::ConfigError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SommelierConfig = toml::from_str(content)
            .map_err(|e| SommelierError::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration
    ///
    /// An explicit path must exist; the default path is used only when
    /// present. The environment API key is applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load(path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    info!("Loading config from {}", path.display());
                    Self::load(&path)?
                }
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()));
        if let Some(key) = key {
            debug!("Using API key from environment");
            self.analysis.api_key = key;
        }
    }

    /// Set the analysis configuration
    pub fn with_analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// Set the camera configuration
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Set the capture configuration
    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let quality = self.capture.jpeg_quality;
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(SommelierError::ConfigError(format!(
                "capture.jpeg_quality must be in (0, 1], got {}",
                quality
            )));
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(SommelierError::ConfigError(
                "camera resolution must be non-zero".to_string(),
            ));
        }

        if self.analysis.model.trim().is_empty() {
            return Err(SommelierError::ConfigError(
                "analysis.model must not be empty".to_string(),
            ));
        }

        if self.analysis.timeout_secs == 0 {
            return Err(SommelierError::ConfigError(
                "analysis.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
