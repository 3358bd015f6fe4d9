//! Playground configuration
//!
//! Loaded from environment variables (after `.env` is applied), with defaults
//! matching the public Judge0 instance.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::judge::PollPolicy;

pub const DEFAULT_JUDGE_URL: &str = "https://judge0-ce.p.rapidapi.com";
/// `X-RapidAPI-Host` sent to the default endpoint unless overridden
pub const DEFAULT_JUDGE_HOST: &str = "judge0-ce.p.rapidapi.com";
/// Widest tab accepted from `EDITOR_TAB_SIZE`
pub const MAX_TAB_SIZE: usize = 16;

/// Remote judge connection settings
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    /// Sent as `X-RapidAPI-Host` when set
    pub api_host: Option<String>,
    /// Sent as `X-RapidAPI-Key` when set
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_URL.into(),
            api_host: Some(DEFAULT_JUDGE_HOST.into()),
            api_key: None,
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 10,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl JudgeConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    pub bind_addr: SocketAddr,
    pub judge: JudgeConfig,
    /// Columns per tab when formatting the editor document
    pub tab_size: usize,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            judge: JudgeConfig::default(),
            tab_size: 4,
        }
    }
}

impl PlaygroundConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = match lookup("PLAYGROUND_BIND") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("Invalid PLAYGROUND_BIND: {}", addr))?,
            None => defaults.bind_addr,
        };

        let base_url = lookup("JUDGE_URL").unwrap_or(defaults.judge.base_url);
        // the RapidAPI endpoint needs its host header
        let api_host = match lookup("JUDGE_API_HOST") {
            Some(host) => Some(host).filter(|v| !v.is_empty()),
            None if base_url == DEFAULT_JUDGE_URL => defaults.judge.api_host,
            None => None,
        };

        let judge = JudgeConfig {
            base_url,
            api_host,
            api_key: lookup("JUDGE_API_KEY").filter(|v| !v.is_empty()),
            poll_interval: match parse_number(&lookup, "JUDGE_POLL_INTERVAL_MS")? {
                Some(ms) => Duration::from_millis(ms),
                None => defaults.judge.poll_interval,
            },
            max_poll_attempts: match parse_number(&lookup, "JUDGE_MAX_POLL_ATTEMPTS")? {
                Some(0) => anyhow::bail!("JUDGE_MAX_POLL_ATTEMPTS must be at least 1"),
                Some(n) => u32::try_from(n).context("JUDGE_MAX_POLL_ATTEMPTS is too large")?,
                None => defaults.judge.max_poll_attempts,
            },
            request_timeout: match parse_number(&lookup, "JUDGE_REQUEST_TIMEOUT_SECS")? {
                Some(secs) => Duration::from_secs(secs),
                None => defaults.judge.request_timeout,
            },
        };

        let tab_size = match parse_number(&lookup, "EDITOR_TAB_SIZE")? {
            Some(n) if n > MAX_TAB_SIZE as u64 => {
                anyhow::bail!("EDITOR_TAB_SIZE must be at most {}", MAX_TAB_SIZE)
            }
            Some(n) => usize::try_from(n).context("EDITOR_TAB_SIZE is too large")?,
            None => defaults.tab_size,
        };

        Ok(Self {
            bind_addr,
            judge,
            tab_size,
        })
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid {}: {}", key, raw))
        })
        .transpose()
}
