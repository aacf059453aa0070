//! Vibe Sommelier - aesthetic tasting notes for a captured scene
//!
//! This crate captures a photograph (live camera or uploaded file), asks a
//! multimodal model to describe its aesthetic, and presents the result as
//! a sommelier's tasting note with a palette and matching music genres.

pub mod analysis;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod platform;
pub mod session;
pub mod testconfig;
pub mod ui;

// Re-export error types
pub use error::{ErrorKind, Result, SommelierError};

// Re-export core types
pub use analysis::{AnalysisResult, AnalysisService, GeminiAnalysisService, UnavailableAnalysis};
pub use camera::{CameraHandle, CameraLease, CameraProvider, CameraRequest};
pub use capture::CapturedImage;
pub use config::SommelierConfig;
pub use session::{SessionController, SessionEvent, SessionSnapshot, SessionState, SharedSession};
