//! Execution backend selection
//!
//! Resolves the request's language, runs it locally or on the remote judge,
//! and normalizes whatever comes back into an [`ExecutionOutcome`]. Nothing
//! here touches the display surfaces.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{ExecutionOutcome, OutcomeKind, OutcomeSource};
use crate::judge::{JudgeClient, JudgeError, PollResult};
use crate::languages::{LanguageTable, Strategy};
use crate::script::{Console, EvalMode, ScriptEngine, ScriptError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: String,
    pub source_code: String,
}

#[derive(Clone)]
pub struct Executor {
    languages: Arc<LanguageTable>,
    engine: Arc<dyn ScriptEngine>,
    console: Arc<Mutex<Console>>,
    judge: JudgeClient,
}

impl Executor {
    pub fn new(
        languages: Arc<LanguageTable>,
        engine: Arc<dyn ScriptEngine>,
        console: Console,
        judge: JudgeClient,
    ) -> Self {
        Self {
            languages,
            engine,
            console: Arc::new(Mutex::new(console)),
            judge,
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let Some(config) = self.languages.get(&request.language) else {
            warn!("Unsupported language: {}", request.language);
            return ExecutionOutcome::unsupported_language();
        };

        let outcome = match config.strategy {
            Strategy::Local => self.evaluate_locally(request.source_code.clone()).await,
            Strategy::Remote { judge_language_id } => {
                match self
                    .judge
                    .submit_and_await(&request.source_code, judge_language_id, cancel)
                    .await
                {
                    Ok(result) => classify(&result),
                    Err(e) => from_judge_error(e),
                }
            }
        };

        info!(
            "Execution finished: language={}, outcome={}",
            config.name, outcome.kind
        );
        outcome
    }

    /// Run `source` in the script engine with the console captured.
    ///
    /// Local runs are serialized on the console lock; the capture guard puts
    /// the original channels back however the evaluation ends.
    async fn evaluate_locally(&self, source: String) -> ExecutionOutcome {
        let engine = self.engine.clone();
        let console = self.console.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut console = console.lock().unwrap_or_else(PoisonError::into_inner);
            let capture = console.capture();
            let result = engine.evaluate(&source, EvalMode::Program, &capture);
            (result, capture.lines())
        });

        match task.await {
            Ok((Ok(value), lines)) => ExecutionOutcome::new(OutcomeKind::Success, "", OutcomeSource::Local)
                .with_console(lines)
                .with_value(value),
            Ok((Err(e), lines)) => {
                ExecutionOutcome::new(OutcomeKind::RuntimeError, e.to_string(), OutcomeSource::Local)
                    .with_console(lines)
            }
            Err(e) => {
                warn!("Local evaluation task failed: {}", e);
                ExecutionOutcome::new(
                    OutcomeKind::RuntimeError,
                    format!("Evaluation aborted: {}", e),
                    OutcomeSource::Local,
                )
            }
        }
    }

    /// Evaluate a one-line expression for the terminal; console output goes
    /// to the host channels, not a capture buffer.
    pub async fn evaluate_expression(&self, source: String) -> Result<Option<String>, ScriptError> {
        let engine = self.engine.clone();
        let console = self.console.clone();

        tokio::task::spawn_blocking(move || {
            let console = console.lock().unwrap_or_else(PoisonError::into_inner);
            engine.evaluate(&source, EvalMode::Expression, &console)
        })
        .await
        .map_err(|e| ScriptError::Engine(format!("Evaluation task failed: {}", e)))?
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Classify a terminal judge response: compile output beats stderr, stderr
/// beats stdout
pub fn classify(result: &PollResult) -> ExecutionOutcome {
    if let Some(compile_output) = non_empty(&result.compile_output) {
        return ExecutionOutcome::new(OutcomeKind::CompileError, compile_output, OutcomeSource::Remote);
    }
    if let Some(stderr) = non_empty(&result.stderr) {
        return ExecutionOutcome::new(OutcomeKind::RuntimeError, stderr, OutcomeSource::Remote);
    }
    ExecutionOutcome::new(
        OutcomeKind::Success,
        result.stdout.clone().unwrap_or_default(),
        OutcomeSource::Remote,
    )
}

/// Map a judge failure onto an outcome.
///
/// A cancelled run is reported as a transport error; its outcome is never
/// shown because a newer run owns the surfaces by then.
fn from_judge_error(e: JudgeError) -> ExecutionOutcome {
    let kind = match e {
        JudgeError::Timeout => OutcomeKind::Timeout,
        JudgeError::Transport(_) | JudgeError::Cancelled => OutcomeKind::TransportError,
    };
    ExecutionOutcome::new(kind, e.to_string(), OutcomeSource::Remote)
}
