//! Result presentation
//!
//! Owns the display surfaces shared by everything in a session:
//! - the output panel (program output, short error lines)
//! - the console panel (captured console lines, error details)
//! - a transient status line
//!
//! Status messages are dismissed by a timer spawned on the runtime; the timer
//! only clears the message it was scheduled for. Nothing in here fails: a
//! poisoned lock is recovered and a missing runtime just leaves the status up.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{ConsoleLevel, ConsoleLine, ExecutionOutcome, OutcomeKind, OutcomeSource};

/// Lifetime of success/failure status messages
pub const STATUS_TTL: Duration = Duration::from_secs(2);
/// Lifetime of warnings (e.g. speech recognition problems)
pub const WARNING_STATUS_TTL: Duration = Duration::from_secs(3);
/// Lifetime of messages about failures the user has to act on
pub const FAILURE_STATUS_TTL: Duration = Duration::from_secs(5);

pub const RUNNING_STATUS: &str = "Running code...";
pub const SUCCESS_STATUS: &str = "Code executed successfully";
pub const FAILURE_STATUS: &str = "Execution failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryClass {
    Result,
    Error,
    ConsoleMessage,
    ErrorMessage,
    WarningMessage,
}

impl From<ConsoleLevel> for EntryClass {
    fn from(level: ConsoleLevel) -> Self {
        match level {
            ConsoleLevel::Log => EntryClass::ConsoleMessage,
            ConsoleLevel::Error => EntryClass::ErrorMessage,
            ConsoleLevel::Warn => EntryClass::WarningMessage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelEntry {
    pub class: EntryClass,
    pub text: String,
}

impl PanelEntry {
    pub fn new(class: EntryClass, text: impl Into<String>) -> Self {
        Self {
            class,
            text: text.into(),
        }
    }
}

impl From<&ConsoleLine> for PanelEntry {
    fn from(line: &ConsoleLine) -> Self {
        PanelEntry::new(line.level.into(), line.message.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Surfaces {
    pub output: Vec<PanelEntry>,
    pub console: Vec<PanelEntry>,
    pub status: Option<String>,
    #[serde(skip)]
    status_generation: u64,
    #[serde(skip)]
    active_run: u64,
}

#[derive(Clone, Default)]
pub struct Presenter {
    surfaces: Arc<Mutex<Surfaces>>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Surfaces> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Surfaces {
        self.lock().clone()
    }

    /// Claim the surfaces for run `run_id`: clear both panels and show the
    /// running status. Runs older than the current claim are ignored.
    pub fn begin_run(&self, run_id: u64) -> bool {
        let mut surfaces = self.lock();
        if run_id < surfaces.active_run {
            return false;
        }
        surfaces.active_run = run_id;
        surfaces.output.clear();
        surfaces.console.clear();
        drop(surfaces);

        self.show_status(RUNNING_STATUS, None);
        true
    }

    /// Render `outcome` if `run_id` still owns the surfaces.
    ///
    /// Returns false when a newer run has claimed them; the outcome is dropped.
    pub fn present(&self, run_id: u64, outcome: &ExecutionOutcome) -> bool {
        let mut surfaces = self.lock();
        if surfaces.active_run != run_id {
            debug!(
                "Dropping outcome of superseded run {} (active run {})",
                run_id, surfaces.active_run
            );
            return false;
        }

        let (output, console) = render(outcome);
        surfaces.output.extend(output);
        surfaces.console.extend(console);
        drop(surfaces);

        let status = if outcome.kind.is_success() {
            SUCCESS_STATUS
        } else {
            FAILURE_STATUS
        };
        self.show_status(status, Some(STATUS_TTL));
        true
    }

    pub fn clear_panels(&self) {
        let mut surfaces = self.lock();
        surfaces.output.clear();
        surfaces.console.clear();
    }

    /// Show `message`; when `ttl` is set, dismissal is scheduled, never awaited
    pub fn show_status(&self, message: impl Into<String>, ttl: Option<Duration>) {
        let generation = {
            let mut surfaces = self.lock();
            surfaces.status = Some(message.into());
            surfaces.status_generation += 1;
            surfaces.status_generation
        };

        let Some(ttl) = ttl else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let surfaces = self.surfaces.clone();
                handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    let mut surfaces = surfaces.lock().unwrap_or_else(PoisonError::into_inner);
                    if surfaces.status_generation == generation {
                        surfaces.status = None;
                    }
                });
            }
            Err(_) => warn!("No runtime available to dismiss status message"),
        }
    }
}

/// Split an outcome into output panel and console panel entries
fn render(outcome: &ExecutionOutcome) -> (Vec<PanelEntry>, Vec<PanelEntry>) {
    let mut output = Vec::new();
    let mut console: Vec<PanelEntry> = outcome.console.iter().map(PanelEntry::from).collect();

    match (outcome.kind, outcome.source) {
        (OutcomeKind::Success, _) => {
            if let Some(value) = &outcome.value {
                output.push(PanelEntry::new(EntryClass::Result, format!("Result: {}", value)));
            }
            if !outcome.message.is_empty() {
                output.push(PanelEntry::new(EntryClass::Result, outcome.message.clone()));
            }
        }
        (OutcomeKind::CompileError, _) => {
            console.push(PanelEntry::new(
                EntryClass::ErrorMessage,
                format!("Compilation Error: {}", outcome.message),
            ));
            output.push(PanelEntry::new(EntryClass::Error, "Compilation failed"));
        }
        (OutcomeKind::RuntimeError, OutcomeSource::Remote) => {
            console.push(PanelEntry::new(
                EntryClass::ErrorMessage,
                format!("Runtime Error: {}", outcome.message),
            ));
            output.push(PanelEntry::new(EntryClass::Error, "Execution failed"));
        }
        (OutcomeKind::RuntimeError, _)
        | (OutcomeKind::Timeout, _)
        | (OutcomeKind::TransportError, _) => {
            output.push(PanelEntry::new(
                EntryClass::Error,
                format!("Error: {}", outcome.message),
            ));
        }
    }

    (output, console)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(kind: OutcomeKind, message: &str) -> ExecutionOutcome {
        ExecutionOutcome::new(kind, message, OutcomeSource::Remote)
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_success_shows_console_and_dismisses_status() {
        let presenter = Presenter::new();
        let outcome = ExecutionOutcome::new(OutcomeKind::Success, "", OutcomeSource::Local)
            .with_console(vec![ConsoleLine::new(ConsoleLevel::Log, "2")]);

        assert!(presenter.begin_run(1));
        assert_eq!(presenter.snapshot().status.as_deref(), Some(RUNNING_STATUS));
        assert!(presenter.present(1, &outcome));

        let surfaces = presenter.snapshot();
        assert!(surfaces.output.is_empty());
        assert_eq!(
            surfaces.console,
            vec![PanelEntry::new(EntryClass::ConsoleMessage, "2")]
        );
        assert_eq!(surfaces.status.as_deref(), Some(SUCCESS_STATUS));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(presenter.snapshot().status.as_deref(), Some(SUCCESS_STATUS));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(presenter.snapshot().status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_success_writes_stdout_to_output() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(1, &remote(OutcomeKind::Success, "hi"));

        let surfaces = presenter.snapshot();
        assert_eq!(surfaces.output, vec![PanelEntry::new(EntryClass::Result, "hi")]);
        assert!(surfaces.console.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stdout_leaves_output_empty() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(1, &remote(OutcomeKind::Success, ""));

        assert!(presenter.snapshot().output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_compile_error_goes_to_console() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(1, &remote(OutcomeKind::CompileError, "missing ;"));

        let surfaces = presenter.snapshot();
        assert_eq!(
            surfaces.console,
            vec![PanelEntry::new(
                EntryClass::ErrorMessage,
                "Compilation Error: missing ;"
            )]
        );
        assert_eq!(
            surfaces.output,
            vec![PanelEntry::new(EntryClass::Error, "Compilation failed")]
        );
        assert_eq!(surfaces.status.as_deref(), Some(FAILURE_STATUS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_runtime_error_goes_to_console() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(1, &remote(OutcomeKind::RuntimeError, "segfault"));

        let surfaces = presenter.snapshot();
        assert_eq!(surfaces.console[0].text, "Runtime Error: segfault");
        assert_eq!(surfaces.output[0].text, "Execution failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_runtime_error_keeps_console_lines() {
        let presenter = Presenter::new();
        let outcome = ExecutionOutcome::new(OutcomeKind::RuntimeError, "boom", OutcomeSource::Local)
            .with_console(vec![
                ConsoleLine::new(ConsoleLevel::Log, "before"),
                ConsoleLine::new(ConsoleLevel::Error, "Runtime Error: boom"),
            ]);
        presenter.begin_run(1);
        presenter.present(1, &outcome);

        let surfaces = presenter.snapshot();
        assert_eq!(surfaces.console.len(), 2);
        assert_eq!(surfaces.console[1].class, EntryClass::ErrorMessage);
        assert_eq!(
            surfaces.output,
            vec![PanelEntry::new(EntryClass::Error, "Error: boom")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shows_error_line() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(
            1,
            &remote(OutcomeKind::Timeout, "Compilation timeout. Please try again."),
        );

        assert_eq!(
            presenter.snapshot().output[0].text,
            "Error: Compilation timeout. Please try again."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_value_is_shown_as_result() {
        let presenter = Presenter::new();
        let outcome = ExecutionOutcome::new(OutcomeKind::Success, "", OutcomeSource::Local)
            .with_value(Some("42".into()));
        presenter.begin_run(1);
        presenter.present(1, &outcome);

        assert_eq!(presenter.snapshot().output[0].text, "Result: 42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_run_is_dropped() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.begin_run(2);

        assert!(!presenter.present(1, &remote(OutcomeKind::Success, "stale")));
        assert!(presenter.snapshot().output.is_empty());

        assert!(presenter.present(2, &remote(OutcomeKind::Success, "fresh")));
        assert_eq!(presenter.snapshot().output[0].text, "fresh");

        // a late claim by an older run does not take the surfaces back
        assert!(!presenter.begin_run(1));
        assert_eq!(presenter.snapshot().output[0].text, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_timer_does_not_clear_newer_status() {
        let presenter = Presenter::new();
        presenter.show_status("first", Some(STATUS_TTL));
        tokio::time::sleep(Duration::from_secs(1)).await;
        presenter.show_status("second", Some(WARNING_STATUS_TTL));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(presenter.snapshot().status.as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(presenter.snapshot().status, None);
    }

    #[test]
    fn test_status_without_runtime_does_not_panic() {
        let presenter = Presenter::new();
        presenter.show_status("no runtime", Some(STATUS_TTL));
        assert_eq!(presenter.snapshot().status.as_deref(), Some("no runtime"));
    }

    #[test]
    fn test_clear_panels() {
        let presenter = Presenter::new();
        presenter.begin_run(1);
        presenter.present(1, &remote(OutcomeKind::CompileError, "x"));
        presenter.clear_panels();

        let surfaces = presenter.snapshot();
        assert!(surfaces.output.is_empty());
        assert!(surfaces.console.is_empty());
    }
}
