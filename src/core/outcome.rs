use serde::{Deserialize, Serialize};
use std::fmt;

/// Final classification of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    TransportError,
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::Success)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::CompileError => "compile_error",
            OutcomeKind::RuntimeError => "runtime_error",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::TransportError => "transport_error",
        };
        write!(f, "{}", s)
    }
}

/// Severity of a line written to the script console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Log,
    Error,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub message: String,
}

impl ConsoleLine {
    pub fn new(level: ConsoleLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Where an outcome came from; decides how the presenter labels error text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    Local,
    Remote,
    None,
}

/// Normalized result of one execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    pub source: OutcomeSource,
    /// Console lines captured during local evaluation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<ConsoleLine>,
    /// Completion value of a local evaluation, already stringified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ExecutionOutcome {
    pub fn new(kind: OutcomeKind, message: impl Into<String>, source: OutcomeSource) -> Self {
        Self {
            kind,
            message: message.into(),
            source,
            console: Vec::new(),
            value: None,
        }
    }

    pub fn unsupported_language() -> Self {
        Self::new(
            OutcomeKind::RuntimeError,
            "unsupported language",
            OutcomeSource::None,
        )
    }

    pub fn with_console(mut self, console: Vec<ConsoleLine>) -> Self {
        self.console = console;
        self
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }
}
