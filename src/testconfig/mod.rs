//! Scripted scenarios for exercising the running app
//!
//! A scenario is a TOML file listing timed actions against the session
//! (open camera, capture, upload a file, reset) with optional assertions
//! on the session snapshot. Asynchronous operations finish after the action
//! that started them, so assertions on their outcome belong on a later
//! action (usually a `log`).

mod runner;

pub use runner::{AssertionContext, AssertionResult, TestCommand, TestRunner};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// A scenario loaded from a TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    /// Scenario metadata
    pub test: TestMetadata,
    /// Timed actions, in order
    pub actions: Vec<TestAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A single action with timing
#[derive(Debug, Clone, Deserialize)]
pub struct TestAction {
    /// Milliseconds after scenario start
    pub time_ms: u64,
    pub action: ActionType,
    /// Checked against the snapshot taken right after the action runs
    #[serde(default)]
    pub assert: Option<Assertion>,
}

/// Actions a scenario can perform
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionType {
    /// Ask for the camera
    RequestCamera,
    /// Snapshot the viewfinder
    Capture,
    /// Upload a file from disk
    SelectFile {
        /// Relative paths resolve against the scenario file
        path: PathBuf,
    },
    /// Return to idle
    Reset,
    /// Exit the application
    Exit {
        #[serde(default)]
        code: i32,
    },
    /// Log a message
    Log { message: String },
}

/// Conditions on the session snapshot
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// Session is in the named state ("idle", "camera_active", ...)
    State { state: String },
    /// A tasting note is present
    HasAnalysis,
    /// An error message is present
    HasError,
    /// Error message contains a substring (case-insensitive)
    ErrorContains { text: String },
    /// Playlist title contains a substring (case-insensitive)
    TitleContains { text: String },
    /// A camera handle is held
    CameraActive,
    /// No camera handle is held
    CameraReleased,
}

impl TestConfig {
    /// Load a scenario from a TOML file
    ///
    /// Relative `select_file` paths are resolved against the file's
    /// directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TestConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TestConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            TestConfigError::Parse { error, .. } => TestConfigError::Parse {
                path: path.display().to_string(),
                error,
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate a scenario
    pub fn from_toml_str(content: &str) -> Result<Self, TestConfigError> {
        let config: TestConfig = toml::from_str(content).map_err(|e| TestConfigError::Parse {
            path: "<inline>".to_string(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for action in &mut self.actions {
            if let ActionType::SelectFile { path } = &mut action.action {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    fn validate(&self) -> Result<(), TestConfigError> {
        if self.actions.is_empty() {
            return Err(TestConfigError::Validation(
                "Test configuration must have at least one action".to_string(),
            ));
        }

        let mut last_time = 0;
        for action in &self.actions {
            if action.time_ms < last_time {
                return Err(TestConfigError::Validation(format!(
                    "Actions must be ordered by time. Found action at {}ms after action at {}ms",
                    action.time_ms, last_time
                )));
            }
            last_time = action.time_ms;

            if let Some(Assertion::State { state }) = &action.assert {
                if crate::session::SessionState::from_name(state).is_none() {
                    return Err(TestConfigError::Validation(format!(
                        "Unknown state '{}' in assertion at {}ms",
                        state, action.time_ms
                    )));
                }
            }
        }

        let has_exit = self
            .actions
            .iter()
            .any(|a| matches!(a.action, ActionType::Exit { .. }));
        if !has_exit {
            return Err(TestConfigError::Validation(
                "Test configuration must have an Exit action".to_string(),
            ));
        }

        Ok(())
    }
}

impl TestAction {
    /// Delay from scenario start
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.time_ms)
    }
}

/// Errors loading or validating a scenario
#[derive(Debug, Clone, Error)]
pub enum TestConfigError {
    #[error("Failed to read test config '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse test config '{path}': {error}")]
    Parse { path: String, error: String },

    #[error("Invalid test config: {0}")]
    Validation(String),
}
