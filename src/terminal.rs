//! Terminal panel: command history and transcript
//!
//! Evaluation of a submitted command happens in the session; this type only
//! tracks what was typed and what came back.

use serde::Serialize;

use crate::script::ScriptError;

pub const PROMPT: &str = ">";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalLineKind {
    Command,
    Result,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalLine {
    pub kind: TerminalLineKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Terminal {
    history: Vec<String>,
    /// Index into `history`; equal to its length when past the newest entry
    cursor: usize,
    output: Vec<TerminalLine>,
}

impl Terminal {
    /// Record a submitted command and echo it after the prompt
    pub fn submit(&mut self, command: &str) {
        self.history.push(command.to_string());
        self.cursor = self.history.len();
        self.output.push(TerminalLine {
            kind: TerminalLineKind::Command,
            text: format!("{} {}", PROMPT, command),
        });
    }

    /// Append the evaluation result of the last command
    pub fn record(&mut self, result: Result<Option<String>, ScriptError>) {
        match result {
            Ok(Some(value)) => self.output.push(TerminalLine {
                kind: TerminalLineKind::Result,
                text: value,
            }),
            Ok(None) => {}
            Err(e) => self.output.push(TerminalLine {
                kind: TerminalLineKind::Error,
                text: format!("Error: {}", e),
            }),
        }
    }

    /// Older history entry for the input box; None leaves the input unchanged
    pub fn history_up(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.history.get(self.cursor).map(String::as_str)
    }

    /// Newer history entry; past the newest one the input is emptied
    pub fn history_down(&mut self) -> &str {
        if self.cursor + 1 < self.history.len() {
            self.cursor += 1;
            &self.history[self.cursor]
        } else {
            self.cursor = self.history.len();
            ""
        }
    }

    pub fn output(&self) -> &[TerminalLine] {
        &self.output
    }
}
