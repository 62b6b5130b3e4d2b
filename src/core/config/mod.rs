//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;
pub use loading::{default_config_paths, load_config_file};

use crate::verification::retry::RetryPolicy;
use std::time::Duration;

/// Runtime configuration settings used by the bulk-verify core logic.
#[derive(Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,

    pub request_timeout: Duration,
    pub sleep_between_requests: (f32, f32),
    pub user_agent: String,

    pub max_retries: u32,
    pub retry_backoff: Duration,

    pub low_credit_threshold: u64,
    pub large_batch_threshold: usize,
    pub save_history: bool,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        Config {
            api_base_url: "http://localhost:8000".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(10),
            sleep_between_requests: (0.0, 0.0),
            user_agent: format!("bulk-verify/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            low_credit_threshold: 10,
            large_batch_threshold: 100,
            save_history: true,
            loaded_config_path: None,
        }
    }

    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("sleep_between_requests", &self.sleep_between_requests)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("low_credit_threshold", &self.low_credit_threshold)
            .field("large_batch_threshold", &self.large_batch_threshold)
            .field("save_history", &self.save_history)
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}

/// Utility function to get a random sleep duration based on [`Config`].
///
/// Uses the `sleep_between_requests` setting from the provided configuration.
/// A `(0.0, 0.0)` range yields a zero duration.
pub fn get_random_sleep_duration(config: &Config) -> Duration {
    random_duration_in(config.sleep_between_requests)
}

pub(crate) fn random_duration_in((min, max): (f32, f32)) -> Duration {
    use rand::Rng;
    if min >= max {
        return Duration::from_secs_f32(min.max(0.0));
    }
    let duration_secs = rand::thread_rng().gen_range(min..max);
    Duration::from_secs_f32(duration_secs)
}
