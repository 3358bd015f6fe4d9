//! HTTP surface over a [`Session`]
//!
//! Every session operation is one route. Bodies are JSON; lookups of missing
//! files or snippets answer 404 with `{"error": ...}`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::editor::{Marker, Position};
use crate::session::{ProblemsView, RunReport, SessionSnapshot, SharedSession, VoiceReport};
use crate::terminal::TerminalLine;
use crate::workspace::{FileEntry, Snippet};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request failed ({}): {}", self.status, self.message);
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub transcript: String,
    #[serde(default = "default_final")]
    pub is_final: bool,
}

fn default_final() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct VoiceErrorRequest {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// None when there is no older entry; the input is left unchanged
    pub input: Option<String>,
}

pub fn router(session: SharedSession) -> Router {
    Router::new()
        .route("/state", get(state))
        .route("/run", post(run))
        .route("/clear", post(clear))
        .route("/format", post(format))
        .route("/save", post(save))
        .route("/files", get(list_files).post(new_file))
        .route("/files/open", post(open_file))
        .route("/files/upload", post(upload_file))
        .route("/language", put(select_language))
        .route("/content", put(set_content))
        .route("/cursor", put(set_cursor))
        .route("/insert", post(insert_text))
        .route("/snippets", get(list_snippets).post(add_snippet))
        .route("/snippets/insert", post(insert_snippet))
        .route("/terminal", post(terminal_submit))
        .route("/terminal/history/up", post(history_up))
        .route("/terminal/history/down", post(history_down))
        .route("/voice", post(voice))
        .route("/voice/error", post(voice_error))
        .route("/problems", get(problems).put(set_markers))
        .with_state(session)
}

async fn state(State(session): State<SharedSession>) -> Json<SessionSnapshot> {
    Json(session.snapshot())
}

async fn run(State(session): State<SharedSession>) -> Json<RunReport> {
    Json(session.run().await)
}

async fn clear(State(session): State<SharedSession>) -> StatusCode {
    session.clear();
    StatusCode::NO_CONTENT
}

async fn format(State(session): State<SharedSession>) -> Json<SessionSnapshot> {
    session.format();
    Json(session.snapshot())
}

async fn save(State(session): State<SharedSession>) -> Json<Vec<FileEntry>> {
    session.save();
    Json(session.list_files())
}

async fn list_files(State(session): State<SharedSession>) -> Json<Vec<FileEntry>> {
    Json(session.list_files())
}

async fn new_file(
    State(session): State<SharedSession>,
    Json(req): Json<NameRequest>,
) -> Json<Vec<FileEntry>> {
    session.new_file(&req.name);
    Json(session.list_files())
}

async fn open_file(
    State(session): State<SharedSession>,
    Json(req): Json<NameRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    if !session.open_file(&req.name) {
        return Err(ApiError::not_found(format!("File not found: {}", req.name)));
    }
    Ok(Json(session.snapshot()))
}

async fn upload_file(
    State(session): State<SharedSession>,
    Json(req): Json<FileUpload>,
) -> Json<Vec<FileEntry>> {
    session.upload_file(&req.name, &req.content);
    Json(session.list_files())
}

async fn select_language(
    State(session): State<SharedSession>,
    Json(req): Json<LanguageRequest>,
) -> Json<SessionSnapshot> {
    session.select_language(&req.language);
    Json(session.snapshot())
}

async fn set_content(
    State(session): State<SharedSession>,
    Json(req): Json<ContentRequest>,
) -> StatusCode {
    session.set_content(&req.content);
    StatusCode::NO_CONTENT
}

async fn set_cursor(
    State(session): State<SharedSession>,
    Json(position): Json<Position>,
) -> Json<SessionSnapshot> {
    session.set_cursor(position);
    Json(session.snapshot())
}

async fn insert_text(
    State(session): State<SharedSession>,
    Json(req): Json<TextRequest>,
) -> Json<SessionSnapshot> {
    session.insert_text(&req.text);
    Json(session.snapshot())
}

async fn list_snippets(State(session): State<SharedSession>) -> Json<Vec<Snippet>> {
    Json(session.list_snippets())
}

async fn add_snippet(
    State(session): State<SharedSession>,
    Json(snippet): Json<FileUpload>,
) -> Json<Vec<Snippet>> {
    session.add_snippet(&snippet.name, &snippet.content);
    Json(session.list_snippets())
}

async fn insert_snippet(
    State(session): State<SharedSession>,
    Json(req): Json<NameRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    if !session.insert_snippet(&req.name) {
        return Err(ApiError::not_found(format!("Snippet not found: {}", req.name)));
    }
    Ok(Json(session.snapshot()))
}

async fn terminal_submit(
    State(session): State<SharedSession>,
    Json(req): Json<CommandRequest>,
) -> Json<Vec<TerminalLine>> {
    Json(session.terminal_submit(&req.command).await)
}

async fn history_up(State(session): State<SharedSession>) -> Json<HistoryEntry> {
    Json(HistoryEntry {
        input: session.terminal_history_up(),
    })
}

async fn history_down(State(session): State<SharedSession>) -> Json<HistoryEntry> {
    Json(HistoryEntry {
        input: Some(session.terminal_history_down()),
    })
}

async fn voice(
    State(session): State<SharedSession>,
    Json(req): Json<VoiceRequest>,
) -> Json<VoiceReport> {
    Json(session.voice(&req.transcript, req.is_final).await)
}

async fn voice_error(
    State(session): State<SharedSession>,
    Json(req): Json<VoiceErrorRequest>,
) -> StatusCode {
    session.voice_error(&req.error);
    StatusCode::NO_CONTENT
}

async fn problems(State(session): State<SharedSession>) -> Json<ProblemsView> {
    Json(session.problems())
}

async fn set_markers(
    State(session): State<SharedSession>,
    Json(markers): Json<Vec<Marker>>,
) -> Json<ProblemsView> {
    session.set_markers(markers);
    Json(session.problems())
}

/// Serve `session` until `shutdown` resolves
pub async fn serve(
    listener: tokio::net::TcpListener,
    session: SharedSession,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
