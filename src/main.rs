mod config;
mod core;
mod editor;
mod executor;
mod judge;
mod languages;
mod presenter;
mod script;
mod server;
mod session;
mod terminal;
mod voice;
mod workspace;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::PlaygroundConfig;
use crate::executor::Executor;
use crate::judge::http::HttpJudgeApi;
use crate::judge::JudgeClient;
use crate::languages::LanguageTable;
use crate::script::{Console, RuntimeLoader, ScriptEngine, V8Engine};
use crate::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playground=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = PlaygroundConfig::from_env()?;
    info!("Starting playground host...");

    let languages = LanguageTable::embedded()?;
    info!(
        "Loaded language table: {}",
        languages.supported_languages().join(", ")
    );

    let engine: Arc<dyn ScriptEngine> = Arc::new(V8Engine::new());
    info!("Script engine: V8 {}", V8Engine::version());

    let judge_api = HttpJudgeApi::new(&config.judge).context("Failed to build judge client")?;
    info!(
        "Remote judge at {} (poll every {:?}, at most {} polls)",
        config.judge.base_url, config.judge.poll_interval, config.judge.max_poll_attempts
    );
    let judge = JudgeClient::new(Arc::new(judge_api), config.judge.poll_policy());

    let executor = Executor::new(
        Arc::new(languages),
        engine.clone(),
        Console::default(),
        judge,
    );
    let session = Arc::new(Session::new(
        executor,
        RuntimeLoader::new(engine),
        config.tab_size,
    ));

    tokio::spawn({
        let session = session.clone();
        async move {
            session.prepare_runtime().await;
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    server::serve(listener, session, shutdown_signal()).await?;

    info!("Playground host stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}
