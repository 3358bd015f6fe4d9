use thiserror::Error;

/// Failures of a remote judge round trip
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JudgeError {
    /// Endpoint unreachable, non-success status, or malformed body
    #[error("{0}")]
    Transport(String),
    /// Poll bound exhausted without a terminal status
    #[error("Compilation timeout. Please try again.")]
    Timeout,
    /// A newer run superseded this one
    #[error("Run cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for JudgeError {
    fn from(e: reqwest::Error) -> Self {
        JudgeError::Transport(e.to_string())
    }
}
