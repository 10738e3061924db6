//! Executor configuration.

use anyhow::{Context as _, Result};
use std::env;
use std::time::Duration;

/// Per-request timeout in seconds; `0` disables it.
pub const TIMEOUT_ENV: &str = "APIFLOW_REQUEST_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "APIFLOW_USER_AGENT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the HTTP side of workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Applied to each request; a timed out request fails its step
    pub request_timeout: Option<Duration>,

    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_TIMEOUT),
            user_agent: format!("apiflow/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ExecutorConfig {
    /// Defaults overridden by `APIFLOW_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = var(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"))?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(agent) = var(USER_AGENT_ENV).filter(|a| !a.trim().is_empty()) {
            config.user_agent = agent;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
