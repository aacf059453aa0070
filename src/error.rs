//! Error types for the Vibe Sommelier
//!
//! Every failure carries its technical cause for the logs, while
//! `user_message()` gives the single reworded line shown in the UI.

use thiserror::Error;

/// Application errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SommelierError {
    /// Camera permission was refused or no device could be opened
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// Frame could not be read from the device or encoded
    #[error("Capture error: {0}")]
    CaptureFailure(String),

    /// Network, remote service or malformed response
    #[error("Analysis error: {0}")]
    AnalysisFailure(String),

    /// Platform does not provide the requested capability
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),
}

/// Tag identifying which kind of failure put a session into `Error`
///
/// Kept alongside the user-facing message so tests and logs can tell
/// failures apart without exposing the cause to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    CaptureFailure,
    AnalysisFailure,
    UnsupportedFeature,
    Config,
    Io,
}

impl From<std::io::Error> for SommelierError {
    fn from(e: std::io::Error) -> Self {
        SommelierError::IOError(e.to_string())
    }
}

impl SommelierError {
    /// Get the kind tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SommelierError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SommelierError::CaptureFailure(_) => ErrorKind::CaptureFailure,
            SommelierError::AnalysisFailure(_) => ErrorKind::AnalysisFailure,
            SommelierError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            SommelierError::ConfigError(_) => ErrorKind::Config,
            SommelierError::IOError(_) => ErrorKind::Io,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors are corrected by the user trying again from the
    /// error screen; the rest need a settings or environment change first.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user can switch to upload or fix permissions and retry
            SommelierError::PermissionDenied(_) => true,
            SommelierError::CaptureFailure(_) => true,
            SommelierError::AnalysisFailure(_) => true,
            // Handled inline as a notice, session is untouched
            SommelierError::UnsupportedFeature(_) => true,
            SommelierError::ConfigError(_) => false,
            SommelierError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    ///
    /// Returns a message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            SommelierError::PermissionDenied(_) => {
                "Camera access was denied. Please use the upload option or check your camera permissions."
                    .to_string()
            }
            SommelierError::CaptureFailure(_) => {
                "The viewfinder lost the frame. Please try capturing again.".to_string()
            }
            SommelierError::AnalysisFailure(_) => {
                "The sommelier is having trouble reading the notes of this scene. Please try another angle."
                    .to_string()
            }
            SommelierError::UnsupportedFeature(_) => {
                "Sharing is not supported on this platform. Copy the link to share!".to_string()
            }
            SommelierError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            SommelierError::IOError(_) => "File system error occurred.".to_string(),
        }
    }

    /// Collapse any failure raised during analysis into `AnalysisFailure`
    ///
    /// Transport errors, service errors and decode errors are deliberately
    /// indistinguishable once they reach the session.
    pub fn into_analysis_failure(self) -> Self {
        match self {
            SommelierError::AnalysisFailure(_) => self,
            other => SommelierError::AnalysisFailure(other.to_string()),
        }
    }
}

/// Result type alias for Vibe Sommelier operations
pub type Result<T> = std::result::Result<T, SommelierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            SommelierError::PermissionDenied("x".into()).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            SommelierError::AnalysisFailure("x".into()).kind(),
            ErrorKind::AnalysisFailure
        );
        assert_eq!(SommelierError::IOError("x".into()).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_user_message_hides_cause() {
        let err = SommelierError::AnalysisFailure("HTTP 503: backend exploded".into());
        let message = err.user_message();
        assert!(!message.contains("503"));
        assert!(!message.is_empty());
    }

    #[test]
    fn test_permission_message_mentions_camera() {
        let message = SommelierError::PermissionDenied("NotAllowedError".into()).user_message();
        assert!(message.to_lowercase().contains("camera"));
    }

    #[test]
    fn test_into_analysis_failure() {
        let err = SommelierError::CaptureFailure("bad jpeg".into()).into_analysis_failure();
        assert_eq!(err.kind(), ErrorKind::AnalysisFailure);
        assert!(err.to_string().contains("bad jpeg"));

        let same = SommelierError::AnalysisFailure("timeout".into());
        assert_eq!(same.clone().into_analysis_failure(), same);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SommelierError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.is_recoverable());
    }
}
