//! Environment-backed configuration for `inbox-smoke`.

use std::env;

use inbox_core::RetryPolicy;
use thiserror::Error;

const DEFAULT_REFRESH_MAX_ATTEMPTS: u32 = 15;
const DEFAULT_REFRESH_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_MESSAGES_PER_PAGE: u16 = 30;
const DEFAULT_EVENT_BUFFER: usize = 64;
const DEFAULT_SMOKE_PENDING_POLLS: usize = 2;

/// Runtime configuration used by the smoke binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Status checks allowed per template refresh job.
    pub refresh_max_attempts: u32,
    /// Fixed delay between status checks.
    pub refresh_retry_delay_ms: u64,
    /// Page size for conversation history fetches.
    pub messages_per_page: u16,
    /// Per-subscriber event buffer for session event hubs.
    pub event_buffer: usize,
    /// "Still refreshing" answers the scripted backend gives before finishing.
    pub pending_polls: usize,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let refresh_max_attempts = parse_or_default(
            "INBOX_REFRESH_MAX_ATTEMPTS",
            DEFAULT_REFRESH_MAX_ATTEMPTS,
            &mut lookup,
        )?;
        let refresh_retry_delay_ms = parse_or_default(
            "INBOX_REFRESH_RETRY_DELAY_MS",
            DEFAULT_REFRESH_RETRY_DELAY_MS,
            &mut lookup,
        )?;
        let messages_per_page = parse_or_default(
            "INBOX_MESSAGES_PER_PAGE",
            DEFAULT_MESSAGES_PER_PAGE,
            &mut lookup,
        )?;
        let event_buffer =
            parse_or_default("INBOX_EVENT_BUFFER", DEFAULT_EVENT_BUFFER, &mut lookup)?;
        let pending_polls = parse_or_default(
            "INBOX_SMOKE_PENDING_POLLS",
            DEFAULT_SMOKE_PENDING_POLLS,
            &mut lookup,
        )?;

        require_positive("INBOX_REFRESH_MAX_ATTEMPTS", u64::from(refresh_max_attempts))?;
        require_positive("INBOX_MESSAGES_PER_PAGE", u64::from(messages_per_page))?;
        require_positive("INBOX_EVENT_BUFFER", event_buffer as u64)?;

        Ok(Self {
            refresh_max_attempts,
            refresh_retry_delay_ms,
            messages_per_page,
            event_buffer,
            pending_polls,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.refresh_max_attempts, self.refresh_retry_delay_ms)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed or is out of range.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn parse_or_default<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
    else {
        return Ok(default);
    };
    value.parse::<T>().map_err(|err| ConfigError::InvalidValue {
        key,
        value,
        reason: err.to_string(),
    })
}

fn require_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: "0".to_owned(),
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(())
}
