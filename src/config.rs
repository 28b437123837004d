//! Client configuration: where the REST backend lives and how long to wait.

use std::fmt;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "DASHBOARD_API_URL";
pub const ENV_TOKEN: &str = "DASHBOARD_API_TOKEN";
pub const ENV_REQUEST_TIMEOUT: &str = "DASHBOARD_REQUEST_TIMEOUT_SECS";
pub const ENV_MUTATION_TIMEOUT: &str = "DASHBOARD_MUTATION_TIMEOUT_SECS";

/// Default transport timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default time after which an optimistic mutation is rolled back.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set but unusable.
    Invalid { key: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "missing configuration: {} environment variable not set", key)
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid configuration for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection settings for a dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
    /// `None` leaves mutations bounded only by the transport.
    pub mutation_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            mutation_timeout: Some(DEFAULT_MUTATION_TIMEOUT),
        }
    }

    /// Load from `DASHBOARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, dotenv map, test fixture).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_BASE_URL))?;

        let mut config = Self::new(base_url.trim());
        config.bearer_token = lookup(ENV_TOKEN).filter(|v| !v.is_empty());

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout = parse_secs(ENV_REQUEST_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MUTATION_TIMEOUT) {
            let secs = parse_secs(ENV_MUTATION_TIMEOUT, &raw)?;
            config.mutation_timeout = (!secs.is_zero()).then_some(secs);
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_mutation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.mutation_timeout = timeout;
        self
    }
}

fn parse_secs(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::Invalid {
            key,
            message: format!("{:?} is not a whole number of seconds ({})", raw, e),
        })
}
