//! In-process script evaluation
//!
//! - `console`: console channels and the scoped capture guard
//! - `v8_engine`: V8-backed [`ScriptEngine`]
//! - `loader`: engine readiness check with retry
//!
//! Evaluation is synchronous and has no time limit; callers run it on a
//! blocking thread.

pub mod console;
pub mod loader;
pub mod v8_engine;

use thiserror::Error;

pub use console::{Console, ConsoleCapture, ConsoleSink, TracingSink};
pub use loader::RuntimeLoader;
pub use v8_engine::V8Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Source is a function body; its `return` value is the completion value
    Program,
    /// Source is evaluated as global code; the last expression is the value
    Expression,
}

impl EvalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMode::Program => "program",
            EvalMode::Expression => "expression",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The evaluated code threw; carries the error's message
    #[error("{0}")]
    Thrown(String),
    /// The engine itself failed
    #[error("Script engine failure: {0}")]
    Engine(String),
}

pub trait ScriptEngine: Send + Sync {
    /// Evaluate `source` in a fresh, isolated context.
    ///
    /// Console output goes to `console`. Returns the stringified completion
    /// value, or `None` when it is `undefined`.
    fn evaluate(
        &self,
        source: &str,
        mode: EvalMode,
        console: &Console,
    ) -> Result<Option<String>, ScriptError>;
}
