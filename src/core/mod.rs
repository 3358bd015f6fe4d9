pub mod outcome;

pub use outcome::{ConsoleLevel, ConsoleLine, ExecutionOutcome, OutcomeKind, OutcomeSource};
