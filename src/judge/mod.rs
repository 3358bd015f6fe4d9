//! Remote judge client
//!
//! Submits source code to a Judge0-style service and polls the submission
//! until the judge reports a terminal status:
//! - exactly one submission per run
//! - polls are strictly sequential with a fixed delay between them
//! - the loop gives up after a bounded number of polls
//!
//! The wire protocol lives behind [`JudgeApi`]; [`http::HttpJudgeApi`] is the
//! reqwest implementation.

pub mod error;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use error::JudgeError;

/// Highest judge status id that still means "not finished" (1 = In Queue, 2 = Processing)
pub const LAST_PENDING_STATUS_ID: i32 = 2;

/// Body of `POST /submissions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub language_id: u32,
    pub source_code: String,
    pub stdin: String,
}

/// Response of `POST /submissions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Accepted submission, owned by one poll loop
#[derive(Debug, Clone)]
pub struct SubmissionHandle {
    pub token: String,
    pub language_id: u32,
    pub created_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: i32,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response of `GET /submissions/{token}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    #[serde(default)]
    pub status: Option<JudgeStatus>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
}

impl PollResult {
    pub fn status_code(&self) -> Option<i32> {
        self.status.as_ref().map(|s| s.id)
    }

    /// A response without a status object is treated as terminal
    pub fn is_terminal(&self) -> bool {
        match self.status_code() {
            Some(id) => id > LAST_PENDING_STATUS_ID,
            None => true,
        }
    }
}

/// Wire operations of the judge service
#[async_trait]
pub trait JudgeApi: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResponse, JudgeError>;

    async fn fetch(&self, token: &str) -> Result<PollResult, JudgeError>;
}

/// Poll loop bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay between two polls
    pub interval: Duration,
    /// Maximum number of polls per submission
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

#[derive(Clone)]
pub struct JudgeClient {
    api: Arc<dyn JudgeApi>,
    policy: PollPolicy,
}

impl JudgeClient {
    pub fn new(api: Arc<dyn JudgeApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Submit `source_code` and wait until the judge reports a terminal status.
    ///
    /// Cancellation is observed before the submission, before every poll and
    /// during the delay between polls.
    pub async fn submit_and_await(
        &self,
        source_code: &str,
        language_id: u32,
        cancel: &CancellationToken,
    ) -> Result<PollResult, JudgeError> {
        if cancel.is_cancelled() {
            return Err(JudgeError::Cancelled);
        }

        let handle = self.submit(source_code, language_id).await?;
        self.await_terminal(&handle, cancel).await
    }

    async fn submit(&self, source_code: &str, language_id: u32) -> Result<SubmissionHandle, JudgeError> {
        let request = SubmissionRequest {
            language_id,
            source_code: source_code.to_string(),
            stdin: String::new(),
        };

        let response = self.api.submit(&request).await?;
        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| JudgeError::Transport("Judge response did not contain a token".into()))?;

        info!("Submission accepted: token={}, language_id={}", token, language_id);

        Ok(SubmissionHandle {
            token,
            language_id,
            created_at: Instant::now(),
        })
    }

    async fn await_terminal(
        &self,
        handle: &SubmissionHandle,
        cancel: &CancellationToken,
    ) -> Result<PollResult, JudgeError> {
        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                debug!("Poll loop for {} cancelled before attempt {}", handle.token, attempt);
                return Err(JudgeError::Cancelled);
            }

            let result = self.api.fetch(&handle.token).await?;

            if result.is_terminal() {
                info!(
                    "Submission {} finished: language_id={}, status={:?}, attempts={}, elapsed={:?}",
                    handle.token,
                    handle.language_id,
                    result.status_code(),
                    attempt,
                    handle.created_at.elapsed()
                );
                return Ok(result);
            }

            debug!(
                "Submission {} pending: status={:?}, attempt {}/{}",
                handle.token,
                result.status_code(),
                attempt,
                self.policy.max_attempts
            );

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.interval) => {}
                    _ = cancel.cancelled() => return Err(JudgeError::Cancelled),
                }
            }
        }

        info!(
            "Submission {} timed out after {} polls",
            handle.token, self.policy.max_attempts
        );
        Err(JudgeError::Timeout)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted judge: returns queued poll responses in order, repeating the
    /// last one when the queue runs dry.
    pub struct FakeJudgeApi {
        submit_response: Result<SubmissionResponse, JudgeError>,
        polls: Mutex<VecDeque<Result<PollResult, JudgeError>>>,
        last: Mutex<Option<Result<PollResult, JudgeError>>>,
        pub submissions: Mutex<Vec<SubmissionRequest>>,
        pub poll_times: Mutex<Vec<Instant>>,
    }

    impl FakeJudgeApi {
        pub fn new(polls: Vec<Result<PollResult, JudgeError>>) -> Self {
            Self {
                submit_response: Ok(SubmissionResponse {
                    token: Some("token-1".into()),
                }),
                polls: Mutex::new(polls.into()),
                last: Mutex::new(None),
                submissions: Mutex::new(Vec::new()),
                poll_times: Mutex::new(Vec::new()),
            }
        }

        pub fn with_submit_response(mut self, response: Result<SubmissionResponse, JudgeError>) -> Self {
            self.submit_response = response;
            self
        }

        pub fn submit_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }

        pub fn poll_count(&self) -> usize {
            self.poll_times.lock().unwrap().len()
        }
    }

    pub fn status(id: i32) -> PollResult {
        PollResult {
            status: Some(JudgeStatus {
                id,
                description: None,
            }),
            ..Default::default()
        }
    }

    #[async_trait]
    impl JudgeApi for FakeJudgeApi {
        async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResponse, JudgeError> {
            self.submissions.lock().unwrap().push(request.clone());
            self.submit_response.clone()
        }

        async fn fetch(&self, token: &str) -> Result<PollResult, JudgeError> {
            assert_eq!(token, "token-1");
            self.poll_times.lock().unwrap().push(Instant::now());

            let next = self.polls.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(response) => {
                    *last = Some(response.clone());
                    response
                }
                None => last.clone().unwrap_or_else(|| Ok(status(1))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{status, FakeJudgeApi};
    use super::*;

    fn client(api: Arc<FakeJudgeApi>) -> JudgeClient {
        JudgeClient::new(api, PollPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal_with_fixed_spacing() {
        let finished = PollResult {
            stdout: Some("hi".into()),
            ..status(3)
        };
        let api = Arc::new(FakeJudgeApi::new(vec![
            Ok(status(1)),
            Ok(status(1)),
            Ok(finished.clone()),
        ]));

        let result = client(api.clone())
            .submit_and_await("int main() {}", 54, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, finished);
        assert_eq!(api.submit_count(), 1);

        let times = api.poll_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(1), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(1010), "gap {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_body() {
        let api = Arc::new(FakeJudgeApi::new(vec![Ok(status(3))]));

        client(api.clone())
            .submit_and_await("class Main {}", 62, &CancellationToken::new())
            .await
            .unwrap();

        let submissions = api.submissions.lock().unwrap();
        assert_eq!(
            submissions[0],
            SubmissionRequest {
                language_id: 62,
                source_code: "class Main {}".into(),
                stdin: String::new(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_ten_pending_polls() {
        let api = Arc::new(FakeJudgeApi::new(vec![Ok(status(2))]));

        let err = client(api.clone())
            .submit_and_await("x", 54, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, JudgeError::Timeout);
        assert_eq!(err.to_string(), "Compilation timeout. Please try again.");
        assert_eq!(api.submit_count(), 1);
        assert_eq!(api.poll_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_is_transport_error() {
        let api = Arc::new(
            FakeJudgeApi::new(vec![]).with_submit_response(Ok(SubmissionResponse { token: None })),
        );

        let err = client(api.clone())
            .submit_and_await("x", 54, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::Transport(_)));
        assert_eq!(api.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_token_is_transport_error() {
        let api = Arc::new(FakeJudgeApi::new(vec![]).with_submit_response(Ok(
            SubmissionResponse {
                token: Some(String::new()),
            },
        )));

        let err = client(api.clone())
            .submit_and_await("x", 54, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_stops_the_loop() {
        let api = Arc::new(FakeJudgeApi::new(vec![
            Ok(status(1)),
            Err(JudgeError::Transport("connection reset".into())),
        ]));

        let err = client(api.clone())
            .submit_and_await("x", 54, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, JudgeError::Transport("connection reset".into()));
        assert_eq!(api.poll_count(), 2);
    }

    #[test]
    fn test_cancelled_before_submission() {
        let api = Arc::new(FakeJudgeApi::new(vec![]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        // resolves on the first poll, without a runtime or any judge call
        let client = client(api.clone());
        let mut run = tokio_test::task::spawn(client.submit_and_await("x", 54, &cancel));
        let err = tokio_test::assert_ready_err!(run.poll());

        assert_eq!(err, JudgeError::Cancelled);
        assert_eq!(api.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_polling() {
        let api = Arc::new(FakeJudgeApi::new(vec![Ok(status(1))]));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                cancel.cancel();
            })
        };

        let err = client(api.clone())
            .submit_and_await("x", 54, &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, JudgeError::Cancelled);
        // polls at t=0s, 1s, 2s; cancelled while waiting for the fourth
        assert_eq!(api.poll_count(), 3);
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!status(1).is_terminal());
        assert!(!status(2).is_terminal());
        assert!(status(3).is_terminal());
        assert!(status(6).is_terminal());
        assert!(status(13).is_terminal());
        assert!(PollResult::default().is_terminal());
    }
}
