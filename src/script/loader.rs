//! Script environment readiness
//!
//! Brings the embedded engine up before the first run and reports progress on
//! the status line. Initialization is retried a bounded number of times.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use super::{Console, EvalMode, ScriptEngine};
use crate::presenter::{Presenter, FAILURE_STATUS_TTL, STATUS_TTL};

pub const MAX_INIT_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct RuntimeLoader {
    engine: Arc<dyn ScriptEngine>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RuntimeLoader {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            max_attempts: MAX_INIT_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Try to bring the engine up; returns whether it is ready
    pub async fn load_with_retry(&self, presenter: &Presenter) -> bool {
        presenter.show_status("Loading script environment...", None);

        for attempt in 1..=self.max_attempts {
            match self.smoke_test().await {
                Ok(()) => {
                    info!("Script environment ready after {} attempt(s)", attempt);
                    presenter.show_status("Script environment ready", Some(STATUS_TTL));
                    return true;
                }
                Err(e) => {
                    warn!(
                        "Script environment initialization failed ({}/{}): {:#}",
                        attempt, self.max_attempts, e
                    );
                    if attempt < self.max_attempts {
                        presenter.show_status(
                            format!(
                                "Retrying initialization ({}/{})...",
                                attempt, self.max_attempts
                            ),
                            None,
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        presenter.show_status(
            "Failed to initialize script environment after multiple attempts.",
            Some(FAILURE_STATUS_TTL),
        );
        false
    }

    async fn smoke_test(&self) -> Result<()> {
        let engine = self.engine.clone();
        let value = tokio::task::spawn_blocking(move || {
            engine.evaluate("1 + 1", EvalMode::Expression, &Console::default())
        })
        .await
        .context("Smoke test task failed")?
        .context("Smoke test evaluation failed")?;

        match value.as_deref() {
            Some("2") => Ok(()),
            other => Err(anyhow!("Unexpected smoke test result: {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` evaluations
    struct FlakyEngine {
        failures: u32,
        calls: AtomicU32,
    }

    impl ScriptEngine for FlakyEngine {
        fn evaluate(
            &self,
            _source: &str,
            _mode: EvalMode,
            _console: &Console,
        ) -> Result<Option<String>, ScriptError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ScriptError::Engine("platform not ready".into()))
            } else {
                Ok(Some("2".into()))
            }
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyEngine> {
        Arc::new(FlakyEngine {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_retries() {
        let engine = flaky(2);
        let presenter = Presenter::new();

        assert!(RuntimeLoader::new(engine.clone()).load_with_retry(&presenter).await);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            presenter.snapshot().status.as_deref(),
            Some("Script environment ready")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let engine = flaky(u32::MAX);
        let presenter = Presenter::new();

        assert!(!RuntimeLoader::new(engine.clone()).load_with_retry(&presenter).await);
        assert_eq!(engine.calls.load(Ordering::SeqCst), MAX_INIT_ATTEMPTS);
        assert!(presenter
            .snapshot()
            .status
            .unwrap()
            .starts_with("Failed to initialize"));
    }

    #[tokio::test]
    async fn test_v8_engine_loads() {
        let presenter = Presenter::new();
        let loader = RuntimeLoader::new(Arc::new(crate::script::V8Engine::new()));

        assert!(loader.load_with_retry(&presenter).await);
    }
}
