//! Sanity checks applied to a fully built [`Config`].

use super::Config;
use crate::core::error::{AppError, Result};
use url::Url;

pub(crate) fn validate(config: &Config) -> Result<()> {
    let url = Url::parse(&config.api_base_url)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Config(format!(
            "API base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Config(format!(
            "API base URL '{}' has no host",
            config.api_base_url
        )));
    }

    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "request_timeout must be greater than zero".to_string(),
        ));
    }

    let (min, max) = config.sleep_between_requests;
    if min < 0.0 || max < 0.0 {
        return Err(AppError::Config(
            "Sleep durations cannot be negative".to_string(),
        ));
    }
    if min > max {
        return Err(AppError::Config(format!(
            "min_sleep ({}) cannot be greater than max_sleep ({})",
            min, max
        )));
    }

    if config.max_retries > 10 {
        return Err(AppError::Config(format!(
            "max_retries ({}) is unreasonably high, use 10 or fewer",
            config.max_retries
        )));
    }

    if config.large_batch_threshold == 0 {
        return Err(AppError::Config(
            "large_batch_threshold must be at least 1".to_string(),
        ));
    }

    if let Some(token) = &config.api_token {
        if token.trim().is_empty() {
            return Err(AppError::Config("API token is empty".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_bad_urls_and_ranges() {
        let ftp = Config {
            api_base_url: "ftp://verify.example.com".into(),
            ..Config::default()
        };
        assert!(validate(&ftp).is_err());

        let garbage = Config {
            api_base_url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(validate(&garbage), Err(AppError::UrlParse(_))));

        let inverted = Config {
            sleep_between_requests: (2.0, 1.0),
            ..Config::default()
        };
        assert!(validate(&inverted).is_err());

        let no_timeout = Config {
            request_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(validate(&no_timeout).is_err());
    }
}
