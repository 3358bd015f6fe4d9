//! Voice command matching
//!
//! Final transcripts are matched against a fixed vocabulary. Matching is a
//! case-insensitive substring test in vocabulary order, so the first listed
//! command found anywhere in the transcript wins.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "text", rename_all = "snake_case")]
pub enum VoiceCommand {
    Run,
    Clear,
    Format,
    Save,
    NewFile,
    /// Text spoken after "insert"
    Insert(String),
    /// No command matched; the transcript is inserted as code
    Dictate(String),
}

impl VoiceCommand {
    /// Vocabulary word, None for dictation
    pub fn name(&self) -> Option<&'static str> {
        match self {
            VoiceCommand::Run => Some("run"),
            VoiceCommand::Clear => Some("clear"),
            VoiceCommand::Format => Some("format"),
            VoiceCommand::Save => Some("save"),
            VoiceCommand::NewFile => Some("new file"),
            VoiceCommand::Insert(_) => Some("insert"),
            VoiceCommand::Dictate(_) => None,
        }
    }
}

const INSERT: &str = "insert";

/// Byte offset of the first ASCII case-insensitive occurrence of `needle`.
///
/// `needle` must be ASCII, so any match starts on a char boundary.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

pub fn parse_transcript(transcript: &str) -> VoiceCommand {
    let simple = [
        ("run", VoiceCommand::Run),
        ("clear", VoiceCommand::Clear),
        ("format", VoiceCommand::Format),
        ("save", VoiceCommand::Save),
        ("new file", VoiceCommand::NewFile),
    ];

    for (word, command) in simple {
        if find_ignore_case(transcript, word).is_some() {
            return command;
        }
    }

    if let Some(start) = find_ignore_case(transcript, INSERT) {
        let text = transcript[start + INSERT.len()..].trim();
        return VoiceCommand::Insert(text.to_string());
    }

    VoiceCommand::Dictate(transcript.to_string())
}
