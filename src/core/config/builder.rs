//! Builds a runtime [`Config`] from defaults, an optional config file and
//! command-line overrides, in that order of precedence (later wins).

use super::file::ConfigFile;
use super::validation;
use super::Config;
use crate::core::error::Result;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<(ConfigFile, PathBuf)>,
    api_base_url: Option<String>,
    api_token: Option<String>,
    request_timeout: Option<u64>,
    max_retries: Option<u32>,
    save_history: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: Option<(ConfigFile, PathBuf)>) -> Self {
        self.file = file;
        self
    }

    pub fn api_base_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.api_base_url = url;
        }
        self
    }

    pub fn api_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.api_token = token;
        }
        self
    }

    /// Request timeout override, in seconds.
    pub fn request_timeout(mut self, secs: Option<u64>) -> Self {
        if secs.is_some() {
            self.request_timeout = secs;
        }
        self
    }

    pub fn max_retries(mut self, retries: Option<u32>) -> Self {
        if retries.is_some() {
            self.max_retries = retries;
        }
        self
    }

    pub fn save_history(mut self, save: Option<bool>) -> Self {
        if save.is_some() {
            self.save_history = save;
        }
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();

        if let Some((file, path)) = self.file {
            apply_file(&mut config, file);
            config.loaded_config_path = Some(path.display().to_string());
        }

        if let Some(url) = self.api_base_url {
            config.api_base_url = url;
        }
        if let Some(token) = self.api_token {
            config.api_token = Some(token);
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(save) = self.save_history {
            config.save_history = save;
        }

        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();

        validation::validate(&config)?;
        tracing::debug!("Final configuration: {:?}", config);
        Ok(config)
    }
}

fn apply_file(config: &mut Config, file: ConfigFile) {
    if let Some(url) = file.api.base_url {
        config.api_base_url = url;
    }
    if file.api.token.is_some() {
        config.api_token = file.api.token;
    }

    if let Some(secs) = file.network.request_timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    let (min, max) = config.sleep_between_requests;
    config.sleep_between_requests = (
        file.network.min_sleep.unwrap_or(min),
        file.network.max_sleep.unwrap_or(max),
    );
    if let Some(agent) = file.network.user_agent {
        config.user_agent = agent;
    }

    if let Some(retries) = file.retry.max_retries {
        config.max_retries = retries;
    }
    if let Some(ms) = file.retry.backoff_ms {
        config.retry_backoff = Duration::from_millis(ms);
    }

    if let Some(threshold) = file.batch.low_credit_threshold {
        config.low_credit_threshold = threshold;
    }
    if let Some(threshold) = file.batch.large_batch_threshold {
        config.large_batch_threshold = threshold;
    }
    if let Some(save) = file.batch.save_history {
        config.save_history = save;
    }
}
