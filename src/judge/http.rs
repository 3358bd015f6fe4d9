//! reqwest implementation of the judge wire protocol

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use super::{JudgeApi, JudgeError, PollResult, SubmissionRequest, SubmissionResponse};
use crate::config::JudgeConfig;

/// Judge0 HTTP API client
#[derive(Clone)]
pub struct HttpJudgeApi {
    client: Client,
    base_url: String,
    api_host: Option<String>,
    api_key: Option<String>,
}

impl HttpJudgeApi {
    pub fn new(config: &JudgeConfig) -> Result<Self, JudgeError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_host: config.api_host.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Attach RapidAPI headers when configured
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.api_host {
            Some(host) => builder.header("X-RapidAPI-Host", host),
            None => builder,
        };
        match &self.api_key {
            Some(key) => builder.header("X-RapidAPI-Key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl JudgeApi for HttpJudgeApi {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResponse, JudgeError> {
        let url = format!("{}/submissions", self.base_url);
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    async fn fetch(&self, token: &str) -> Result<PollResult, JudgeError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=false",
            self.base_url, token
        );
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}
