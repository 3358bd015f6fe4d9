//! Playground session
//!
//! One explicit context object per host. It owns the editor document, the
//! session files, snippets and terminal, and sequences runs so that only the
//! most recent run writes to the display surfaces.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{ExecutionOutcome, OutcomeKind, OutcomeSource};
use crate::editor::{EditorBuffer, Marker, Position, Problem};
use crate::executor::{ExecutionRequest, Executor};
use crate::presenter::{Presenter, Surfaces, STATUS_TTL, WARNING_STATUS_TTL};
use crate::script::RuntimeLoader;
use crate::terminal::{Terminal, TerminalLine};
use crate::voice::{parse_transcript, VoiceCommand};
use crate::workspace::{FileEntry, FileStore, Snippet, SnippetPalette};

pub const DEFAULT_LANGUAGE: &str = "javascript";
pub const NO_PROBLEMS: &str = "No problems found";

const WELCOME_SOURCE: &str = "// Write your code here\nconsole.log('Hello, World!');\n";

struct SessionState {
    editor: EditorBuffer,
    files: FileStore,
    snippets: SnippetPalette,
    terminal: Terminal,
    language: String,
    run_seq: u64,
    in_flight: Option<CancellationToken>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: u64,
    pub outcome: ExecutionOutcome,
    /// False when a newer run took over the surfaces first
    pub presented: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemsView {
    pub problems: Vec<Problem>,
    /// Set when there is nothing to list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub language: String,
    pub current_file: String,
    pub content: String,
    pub cursor: Position,
    pub file_size: usize,
    #[serde(flatten)]
    pub surfaces: Surfaces,
    pub terminal: Vec<TerminalLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceReport {
    pub command: Option<VoiceCommand>,
    /// Set when the command started a run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunReport>,
}

pub struct Session {
    executor: Executor,
    presenter: Presenter,
    loader: RuntimeLoader,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(executor: Executor, loader: RuntimeLoader, tab_size: usize) -> Self {
        let state = SessionState {
            editor: EditorBuffer::new(WELCOME_SOURCE, tab_size),
            files: FileStore::new(WELCOME_SOURCE),
            snippets: SnippetPalette::default(),
            terminal: Terminal::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            run_seq: 0,
            in_flight: None,
        };

        Self {
            executor,
            presenter: Presenter::new(),
            loader,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bring the script engine up before the first local run
    pub async fn prepare_runtime(&self) -> bool {
        self.loader.load_with_retry(&self.presenter).await
    }

    /// Run the editor content with the selected language.
    ///
    /// Starting a run cancels the one in flight; the older run's outcome is
    /// still returned to its caller but never reaches the panels. Execution
    /// and presentation happen on their own task, so a caller that goes away
    /// mid-run does not leave the running status behind.
    pub async fn run(&self) -> RunReport {
        self.run_announced(None).await
    }

    /// Start a run, then show `announce` over the running status
    async fn run_announced(&self, announce: Option<String>) -> RunReport {
        let (run_id, request, cancel) = {
            let mut state = self.lock();
            if let Some(previous) = state.in_flight.take() {
                debug!("Cancelling run {}", state.run_seq);
                previous.cancel();
            }
            state.run_seq += 1;
            let cancel = CancellationToken::new();
            state.in_flight = Some(cancel.clone());

            let request = ExecutionRequest {
                language: state.language.clone(),
                source_code: state.editor.value().to_string(),
            };
            (state.run_seq, request, cancel)
        };

        info!("Starting run {} ({})", run_id, request.language);
        self.presenter.begin_run(run_id);
        if let Some(message) = announce {
            self.presenter.show_status(message, Some(STATUS_TTL));
        }

        let executor = self.executor.clone();
        let presenter = self.presenter.clone();
        let task = tokio::spawn(async move {
            let outcome = executor.execute(&request, &cancel).await;
            let presented = presenter.present(run_id, &outcome);
            (outcome, presented)
        });

        let (outcome, presented) = match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Run {} aborted: {}", run_id, e);
                let outcome = ExecutionOutcome::new(
                    OutcomeKind::RuntimeError,
                    format!("Run aborted: {}", e),
                    OutcomeSource::None,
                );
                let presented = self.presenter.present(run_id, &outcome);
                (outcome, presented)
            }
        };

        {
            let mut state = self.lock();
            if state.run_seq == run_id {
                state.in_flight = None;
            }
        }

        RunReport {
            run_id,
            outcome,
            presented,
        }
    }

    pub fn clear(&self) {
        self.presenter.clear_panels();
    }

    pub fn format(&self) {
        self.lock().editor.format();
    }

    pub fn save(&self) {
        {
            let mut state = self.lock();
            let content = state.editor.value().to_string();
            state.files.save_current(content);
            info!("Saved {}", state.files.current());
        }
        self.presenter
            .show_status("File saved successfully", Some(STATUS_TTL));
    }

    pub fn new_file(&self, name: &str) {
        let mut state = self.lock();
        state.files.create(name);
        state.editor.set_value("");
    }

    /// Returns false if no such file exists
    pub fn open_file(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some(content) = state.files.open(name).map(str::to_string) else {
            return false;
        };
        state.editor.set_value(content);
        true
    }

    pub fn upload_file(&self, name: &str, content: &str) {
        let mut state = self.lock();
        state.files.upload(name, content);
        state.editor.set_value(content);
    }

    pub fn list_files(&self) -> Vec<FileEntry> {
        self.lock().files.list()
    }

    /// Switch language; the current file is renamed to `untitled.<ext>`
    pub fn select_language(&self, language: &str) {
        let extension = self.executor.languages().extension_for(language);
        let mut state = self.lock();
        state.language = language.to_string();
        state.files.set_current(format!("untitled.{}", extension));
    }

    pub fn set_content(&self, content: &str) {
        self.lock().editor.set_value(content);
    }

    pub fn set_cursor(&self, position: Position) {
        self.lock().editor.set_cursor(position);
    }

    pub fn insert_text(&self, text: &str) {
        self.lock().editor.insert_at_cursor(text);
    }

    pub fn add_snippet(&self, name: &str, content: &str) {
        self.lock().snippets.add(name, content);
    }

    pub fn list_snippets(&self) -> Vec<Snippet> {
        self.lock().snippets.list()
    }

    /// Insert snippet `name` at the cursor; false if it does not exist
    pub fn insert_snippet(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some(content) = state.snippets.get(name).map(str::to_string) else {
            return false;
        };
        state.editor.insert_at_cursor(&content);
        true
    }

    /// Echo and evaluate one terminal command; returns the terminal transcript
    pub async fn terminal_submit(&self, command: &str) -> Vec<TerminalLine> {
        self.lock().terminal.submit(command);
        let result = self.executor.evaluate_expression(command.to_string()).await;

        let mut state = self.lock();
        state.terminal.record(result);
        state.terminal.output().to_vec()
    }

    pub fn terminal_history_up(&self) -> Option<String> {
        self.lock().terminal.history_up().map(str::to_string)
    }

    pub fn terminal_history_down(&self) -> String {
        self.lock().terminal.history_down().to_string()
    }

    /// Act on a speech transcript; interim transcripts are ignored
    pub async fn voice(&self, transcript: &str, is_final: bool) -> VoiceReport {
        if !is_final {
            return VoiceReport {
                command: None,
                run: None,
            };
        }

        let command = parse_transcript(transcript);
        if let Some(name) = command.name() {
            info!("Voice command: {}", name);
        }
        let announce = command.name().map(|name| format!("Executed command: {}", name));

        let mut run = None;
        match &command {
            VoiceCommand::Run => {
                run = Some(self.run_announced(announce.clone()).await);
            }
            VoiceCommand::Clear => self.clear(),
            VoiceCommand::Format => self.format(),
            VoiceCommand::Save => self.save(),
            VoiceCommand::NewFile => {
                let mut state = self.lock();
                let extension = self.executor.languages().extension_for(&state.language);
                let name = state.files.next_untitled(extension);
                state.files.create(name);
                state.editor.set_value("");
            }
            VoiceCommand::Insert(text) | VoiceCommand::Dictate(text) => self.insert_text(text),
        }

        if let Some(message) = announce.filter(|_| run.is_none()) {
            self.presenter.show_status(message, Some(STATUS_TTL));
        }

        VoiceReport {
            command: Some(command),
            run,
        }
    }

    /// Report a speech recognition failure on the status line
    pub fn voice_error(&self, error: &str) {
        warn!("Speech recognition error: {}", error);
        self.presenter.show_status(
            format!("Speech recognition error: {}", error),
            Some(WARNING_STATUS_TTL),
        );
    }

    pub fn set_markers(&self, markers: Vec<Marker>) {
        self.lock().editor.set_markers(markers);
    }

    pub fn problems(&self) -> ProblemsView {
        let problems = self.lock().editor.problems();
        let message = problems.is_empty().then_some(NO_PROBLEMS);
        ProblemsView { problems, message }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            language: state.language.clone(),
            current_file: state.files.current().to_string(),
            content: state.editor.value().to_string(),
            cursor: state.editor.cursor(),
            file_size: state.editor.byte_size(),
            surfaces: self.presenter.snapshot(),
            terminal: state.terminal.output().to_vec(),
        }
    }
}

/// Shared handle used by the HTTP layer
pub type SharedSession = Arc<Session>;
