//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

use super::types::Res;

/// Default Telegram Bot API base URL.
fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Default number of updates requested per fetch.
fn default_updates_process_limit() -> u32 {
    15
}

/// Default polling interval.
fn default_updates_check_period() -> Duration {
    Duration::from_secs(3)
}

/// Default number of attempts for fetching updates.
fn default_request_retry_attempts() -> u32 {
    3
}

/// Default number of attempts for sending a message.
fn default_response_retry_attempts() -> u32 {
    3
}

/// Default period of the finished-timer sweep.
fn default_sweep_period() -> Duration {
    Duration::from_secs(60)
}

/// Default timer duration, in minutes.
fn default_time_mins() -> u32 {
    25
}

/// Default notice sent when a timer rings.
fn default_notice() -> String {
    "Pomodoro!".to_string()
}

/// Default number of consecutive failed fetch cycles tolerated by the polling loop.
fn default_fetch_failure_limit() -> u32 {
    5
}

/// Configuration for the pomodoro-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Telegram bot token (`POMODORO_BOT_BOT_TOKEN`).
    pub bot_token: String,
    /// Telegram Bot API base URL (`POMODORO_BOT_API_BASE_URL`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Enable debug logs (`POMODORO_BOT_ENABLE_DEBUG_LOGS`).
    #[serde(default)]
    pub enable_debug_logs: bool,
    /// Maximum number of updates per fetch (`POMODORO_BOT_UPDATES_PROCESS_LIMIT`).
    #[serde(default = "default_updates_process_limit")]
    pub updates_process_limit: u32,
    /// Seconds between fetch cycles (`POMODORO_BOT_UPDATES_CHECK_PERIOD`).
    /// Also the first backoff wait of a failed request.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_updates_check_period")]
    pub updates_check_period: Duration,
    /// Attempts for fetching updates (`POMODORO_BOT_REQUEST_RETRY_ATTEMPTS`).
    #[serde(default = "default_request_retry_attempts")]
    pub request_retry_attempts: u32,
    /// Attempts for sending a message (`POMODORO_BOT_RESPONSE_RETRY_ATTEMPTS`).
    #[serde(default = "default_response_retry_attempts")]
    pub response_retry_attempts: u32,
    /// Seconds between finished-timer sweeps, `0` disables sweeping (`POMODORO_BOT_SWEEP_PERIOD`).
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_sweep_period")]
    pub sweep_period: Duration,
    /// Duration used by a bare `/set` (`POMODORO_BOT_DEFAULT_TIME_MINS`).
    #[serde(default = "default_time_mins")]
    pub default_time_mins: u32,
    /// Notice used when none is given (`POMODORO_BOT_DEFAULT_NOTICE`).
    #[serde(default = "default_notice")]
    pub default_notice: String,
    /// Consecutive failed fetch cycles before the polling loop gives up (`POMODORO_BOT_FETCH_FAILURE_LIMIT`).
    #[serde(default = "default_fetch_failure_limit")]
    pub fetch_failure_limit: u32,
    /// Optional OTLP/HTTP traces endpoint, e.g. `http://localhost:4318/v1/traces` (`POMODORO_BOT_OTLP_ENDPOINT`).
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_api_base_url(),
            enable_debug_logs: false,
            updates_process_limit: default_updates_process_limit(),
            updates_check_period: default_updates_check_period(),
            request_retry_attempts: default_request_retry_attempts(),
            response_retry_attempts: default_response_retry_attempts(),
            sweep_period: default_sweep_period(),
            default_time_mins: default_time_mins(),
            default_notice: default_notice(),
            fetch_failure_limit: default_fetch_failure_limit(),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Environment variables take precedence over the file.
        cfg = cfg.add_source(config::Environment::with_prefix("POMODORO_BOT").try_parsing(true));

        let inner: ConfigInner = cfg.build()?.try_deserialize()?;
        inner.validate()?;

        Ok(inner.into())
    }
}

impl ConfigInner {
    pub fn validate(&self) -> Res<()> {
        if self.bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Bot token must be set."));
        }

        if self.default_time_mins == 0 {
            return Err(anyhow::anyhow!("Default time must be at least one minute."));
        }

        if self.default_notice.is_empty() {
            return Err(anyhow::anyhow!("Default notice must not be empty."));
        }

        if self.updates_process_limit < 1 || self.updates_process_limit > 100 {
            return Err(anyhow::anyhow!("Updates process limit must be between 1 and 100."));
        }

        if self.fetch_failure_limit == 0 {
            return Err(anyhow::anyhow!("Fetch failure limit must be at least 1."));
        }

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ConfigInner {
        ConfigInner {
            bot_token: "123:abc".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_values() {
        let config = valid();

        assert_eq!(config.default_time_mins, 25);
        assert_eq!(config.default_notice, "Pomodoro!");
        assert_eq!(config.updates_process_limit, 15);
        assert_eq!(config.updates_check_period, Duration::from_secs(3));
        assert_eq!(config.sweep_period, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_missing_token() {
        let config = ConfigInner::default();

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let zero_time = ConfigInner { default_time_mins: 0, ..valid() };
        let huge_limit = ConfigInner { updates_process_limit: 101, ..valid() };
        let no_failures = ConfigInner { fetch_failure_limit: 0, ..valid() };

        assert!(zero_time.validate().is_err());
        assert!(huge_limit.validate().is_err());
        assert!(no_failures.validate().is_err());
    }

    #[test]
    fn deserializes_periods_as_seconds() {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(
                "bot_token = \"t\"\nupdates_check_period = 7\nsweep_period = 0\ndefault_notice = \"Break!\"",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let inner: ConfigInner = cfg.try_deserialize().unwrap();

        assert_eq!(inner.updates_check_period, Duration::from_secs(7));
        assert_eq!(inner.sweep_period, Duration::ZERO);
        assert_eq!(inner.default_notice, "Break!");
        assert_eq!(inner.default_time_mins, 25);
    }
}
