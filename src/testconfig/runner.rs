//! Scenario runner
//!
//! Schedules scenario actions against wall-clock time and checks
//! assertions against session snapshots.

use super::{ActionType, Assertion, TestConfig};
use crate::session::{SessionSnapshot, SessionState};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Commands the runner hands to the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCommand {
    RequestCamera,
    Capture,
    SelectFile { path: PathBuf },
    Reset,
    Log { message: String },
    Exit { code: i32 },
}

/// Result of an assertion check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionResult {
    Passed,
    Failed(String),
}

/// Session facts an assertion is checked against
#[derive(Debug, Clone)]
pub struct AssertionContext {
    pub state: SessionState,
    pub has_analysis: bool,
    pub playlist_title: Option<String>,
    pub error_message: Option<String>,
    pub camera_active: bool,
}

impl AssertionContext {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            state: snapshot.state,
            has_analysis: snapshot.analysis.is_some(),
            playlist_title: snapshot
                .analysis
                .as_ref()
                .map(|a| a.playlist_title.clone()),
            error_message: snapshot.error_message().map(str::to_string),
            camera_active: snapshot.camera_active(),
        }
    }
}

/// Runs one scenario
pub struct TestRunner {
    config: TestConfig,
    start_time: Option<Instant>,
    current_action_index: usize,
    completed: bool,
    test_passed: bool,
    failures: Vec<String>,
}

impl TestRunner {
    pub fn new(config: TestConfig) -> Self {
        info!("[TEST] Loaded test configuration: {}", config.test.name);
        if !config.test.description.is_empty() {
            info!("[TEST] Description: {}", config.test.description);
        }
        info!("[TEST] Total actions: {}", config.actions.len());

        Self {
            config,
            start_time: None,
            current_action_index: 0,
            completed: false,
            test_passed: true,
            failures: Vec::new(),
        }
    }

    /// Start the clock (call on the first frame)
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
            info!("[TEST] Test started: {}", self.config.test.name);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Only meaningful after completion
    pub fn test_passed(&self) -> bool {
        self.test_passed
    }

    /// Reasons for every failed assertion so far
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Next due command, if any
    pub fn poll(&mut self) -> Option<(TestCommand, Option<Assertion>)> {
        let elapsed = self.elapsed();
        self.poll_at(elapsed)
    }

    /// Next command due at `elapsed`
    ///
    /// Returns `None` before [`TestRunner::start`] has been called.
    pub fn poll_at(&mut self, elapsed: Duration) -> Option<(TestCommand, Option<Assertion>)> {
        if self.completed || self.start_time.is_none() {
            return None;
        }

        let Some(action) = self.config.actions.get(self.current_action_index) else {
            self.completed = true;
            return None;
        };

        if elapsed < action.delay() {
            return None;
        }

        debug!(
            "[TEST] Executing action at {}ms: {:?}",
            action.time_ms, action.action
        );
        let command = to_command(&action.action);
        let assertion = action.assert.clone();

        self.current_action_index += 1;
        if self.current_action_index >= self.config.actions.len() {
            self.completed = true;
        }

        Some((command, assertion))
    }

    /// Check an assertion and record the outcome
    pub fn check_assertion(
        &mut self,
        assertion: &Assertion,
        context: &AssertionContext,
    ) -> AssertionResult {
        let result = evaluate(assertion, context);

        match &result {
            AssertionResult::Passed => {
                info!("[TEST] PASS: Assertion {:?}", assertion);
            }
            AssertionResult::Failed(reason) => {
                error!("[TEST] FAIL: Assertion {:?} - {}", assertion, reason);
                self.test_passed = false;
                self.failures.push(reason.clone());
            }
        }

        result
    }

    pub fn summary(&self) -> String {
        let status = if self.test_passed { "PASSED" } else { "FAILED" };
        format!(
            "[TEST] Test '{}' {}: Executed {} actions in {:?}",
            self.config.test.name,
            status,
            self.current_action_index,
            self.elapsed()
        )
    }
}

fn to_command(action: &ActionType) -> TestCommand {
    match action {
        ActionType::RequestCamera => TestCommand::RequestCamera,
        ActionType::Capture => TestCommand::Capture,
        ActionType::SelectFile { path } => TestCommand::SelectFile { path: path.clone() },
        ActionType::Reset => TestCommand::Reset,
        ActionType::Log { message } => TestCommand::Log {
            message: message.clone(),
        },
        ActionType::Exit { code } => TestCommand::Exit { code: *code },
    }
}

fn evaluate(assertion: &Assertion, context: &AssertionContext) -> AssertionResult {
    let check = |ok: bool, reason: String| {
        if ok {
            AssertionResult::Passed
        } else {
            AssertionResult::Failed(reason)
        }
    };

    match assertion {
        Assertion::State { state } => match SessionState::from_name(state) {
            Some(expected) => check(
                context.state == expected,
                format!("Expected state {}, got {}", expected, context.state),
            ),
            None => AssertionResult::Failed(format!("Unknown state '{}'", state)),
        },
        Assertion::HasAnalysis => check(
            context.has_analysis,
            format!("Expected an analysis in state {}", context.state),
        ),
        Assertion::HasError => check(
            context.error_message.is_some(),
            format!("Expected an error in state {}", context.state),
        ),
        Assertion::ErrorContains { text } => {
            let message = context.error_message.as_deref().unwrap_or_default();
            check(
                contains_ignore_case(message, text),
                format!("Expected error containing '{}', got '{}'", text, message),
            )
        }
        Assertion::TitleContains { text } => {
            let title = context.playlist_title.as_deref().unwrap_or_default();
            check(
                contains_ignore_case(title, text),
                format!("Expected title containing '{}', got '{}'", text, title),
            )
        }
        Assertion::CameraActive => check(
            context.camera_active,
            "Expected a camera to be held".to_string(),
        ),
        Assertion::CameraReleased => check(
            !context.camera_active,
            "Expected the camera to be released".to_string(),
        ),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> TestConfig {
        TestConfig::from_toml_str(
            r#"
            [test]
            name = "Runner"

            [[actions]]
            time_ms = 100
            action = { type = "request_camera" }
            assert = { type = "camera_active" }

            [[actions]]
            time_ms = 300
            action = { type = "select_file", path = "/tmp/room.png" }

            [[actions]]
            time_ms = 300
            action = { type = "exit", code = 0 }
            "#,
        )
        .unwrap()
    }

    fn context(state: SessionState) -> AssertionContext {
        AssertionContext {
            state,
            has_analysis: false,
            playlist_title: None,
            error_message: None,
            camera_active: false,
        }
    }

    #[test]
    fn test_nothing_before_start() {
        let mut runner = TestRunner::new(scenario());
        assert!(runner.poll_at(Duration::from_secs(10)).is_none());
        assert!(!runner.is_completed());
    }

    #[test]
    fn test_actions_fire_in_time_order() {
        let mut runner = TestRunner::new(scenario());
        runner.start();

        assert!(runner.poll_at(Duration::from_millis(50)).is_none());

        let (command, assertion) = runner.poll_at(Duration::from_millis(100)).unwrap();
        assert_eq!(command, TestCommand::RequestCamera);
        assert!(matches!(assertion, Some(Assertion::CameraActive)));

        assert!(runner.poll_at(Duration::from_millis(200)).is_none());

        let (command, _) = runner.poll_at(Duration::from_millis(300)).unwrap();
        assert_eq!(
            command,
            TestCommand::SelectFile {
                path: PathBuf::from("/tmp/room.png")
            }
        );
        let (command, _) = runner.poll_at(Duration::from_millis(300)).unwrap();
        assert_eq!(command, TestCommand::Exit { code: 0 });
        assert!(runner.is_completed());
        assert!(runner.poll_at(Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_failed_assertion_fails_test() {
        let mut runner = TestRunner::new(scenario());
        let result = runner.check_assertion(&Assertion::CameraActive, &context(SessionState::Idle));
        assert!(matches!(result, AssertionResult::Failed(_)));
        assert!(!runner.test_passed());
        assert_eq!(runner.failures().len(), 1);
        assert!(runner.summary().contains("FAILED"));
    }

    #[test]
    fn test_state_assertion() {
        let mut runner = TestRunner::new(scenario());
        let state = Assertion::State {
            state: "loading".into(),
        };
        assert_eq!(
            runner.check_assertion(&state, &context(SessionState::Loading)),
            AssertionResult::Passed
        );
        assert!(runner.test_passed());
    }

    #[test]
    fn test_error_contains_is_case_insensitive() {
        let mut runner = TestRunner::new(scenario());
        let mut ctx = context(SessionState::Error);
        ctx.error_message = Some("Camera access was denied.".into());

        let assertion = Assertion::ErrorContains {
            text: "CAMERA".into(),
        };
        assert_eq!(
            runner.check_assertion(&assertion, &ctx),
            AssertionResult::Passed
        );
        assert_eq!(
            runner.check_assertion(&Assertion::HasAnalysis, &ctx),
            AssertionResult::Failed("Expected an analysis in state Error".into())
        );
    }
}
