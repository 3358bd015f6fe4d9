//! Console channels seen by evaluated scripts
//!
//! A [`Console`] routes each level (`log`, `error`, `warn`) to a sink. By
//! default every level goes to the host log. [`Console::capture`] swaps all
//! three channels for buffering sinks and returns a guard; the original sinks
//! are put back when the guard is dropped, whichever way the evaluation ends.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::core::{ConsoleLevel, ConsoleLine};

const LEVELS: [ConsoleLevel; 3] = [ConsoleLevel::Log, ConsoleLevel::Error, ConsoleLevel::Warn];

pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: ConsoleLevel, message: &str);
}

/// Forwards script console output to the host log
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Log => info!(target: "playground::console", "{}", message),
            ConsoleLevel::Error | ConsoleLevel::Warn => {
                warn!(target: "playground::console", level = ?level, "{}", message)
            }
        }
    }
}

type LineBuffer = Arc<Mutex<Vec<ConsoleLine>>>;

/// Records a line, then hands it to the channel it replaced
struct BufferSink {
    buffer: LineBuffer,
    forward: Arc<dyn ConsoleSink>,
}

impl ConsoleSink for BufferSink {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConsoleLine::new(level, message));
        self.forward.write(level, message);
    }
}

pub struct Console {
    log: Arc<dyn ConsoleSink>,
    error: Arc<dyn ConsoleSink>,
    warn: Arc<dyn ConsoleSink>,
}

impl Console {
    pub fn new(sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            log: sink.clone(),
            error: sink.clone(),
            warn: sink,
        }
    }

    pub fn write(&self, level: ConsoleLevel, message: &str) {
        self.channel(level).write(level, message);
    }

    pub fn channel(&self, level: ConsoleLevel) -> &Arc<dyn ConsoleSink> {
        match level {
            ConsoleLevel::Log => &self.log,
            ConsoleLevel::Error => &self.error,
            ConsoleLevel::Warn => &self.warn,
        }
    }

    fn channel_mut(&mut self, level: ConsoleLevel) -> &mut Arc<dyn ConsoleSink> {
        match level {
            ConsoleLevel::Log => &mut self.log,
            ConsoleLevel::Error => &mut self.error,
            ConsoleLevel::Warn => &mut self.warn,
        }
    }

    /// Redirect every channel into a capture buffer until the guard drops
    pub fn capture(&mut self) -> ConsoleCapture<'_> {
        let buffer = LineBuffer::default();
        let saved = LEVELS.map(|level| {
            let original = self.channel(level).clone();
            let capturing: Arc<dyn ConsoleSink> = Arc::new(BufferSink {
                buffer: buffer.clone(),
                forward: original.clone(),
            });
            *self.channel_mut(level) = capturing;
            original
        });

        ConsoleCapture {
            console: self,
            saved,
            buffer,
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

/// Scoped redirection of a [`Console`]; restores the original channels on drop
pub struct ConsoleCapture<'a> {
    console: &'a mut Console,
    saved: [Arc<dyn ConsoleSink>; 3],
    buffer: LineBuffer,
}

impl ConsoleCapture<'_> {
    /// Lines written so far, in order
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Deref for ConsoleCapture<'_> {
    type Target = Console;

    fn deref(&self) -> &Console {
        self.console
    }
}

impl DerefMut for ConsoleCapture<'_> {
    fn deref_mut(&mut self) -> &mut Console {
        self.console
    }
}

impl Drop for ConsoleCapture<'_> {
    fn drop(&mut self) {
        for (level, original) in LEVELS.into_iter().zip(self.saved.iter()) {
            *self.console.channel_mut(level) = original.clone();
        }
    }
}
