//! Endpoint configuration for the annotation service, loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api/ai";
pub const DEFAULT_INSIGHT_BASE_URL: &str = "http://127.0.0.1:5005";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the annotation operations live.
///
/// `base_url` serves analyze, suggest, complete, auto-reply and translate; `insight_base_url`
/// serves insight and smart-search.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub insight_base_url: String,
    pub timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            insight_base_url: DEFAULT_INSIGHT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EndpointConfig {
    /// Both operation groups on one server (e.g. a mock server in tests).
    pub fn single(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            insight_base_url: base_url.clone(),
            base_url,
            ..Self::default()
        }
    }

    /// Load from `ANNOTATION_BASE_URL`, `INSIGHT_BASE_URL` and `ANNOTATION_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("ANNOTATION_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let insight_base_url =
            env::var("INSIGHT_BASE_URL").unwrap_or_else(|_| DEFAULT_INSIGHT_BASE_URL.to_string());
        let timeout_secs = match env::var("ANNOTATION_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("ANNOTATION_TIMEOUT_SECS is not a number: {}", raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            base_url: trim_slash(base_url),
            insight_base_url: trim_slash(insight_base_url),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var("ANNOTATION_BASE_URL");
        env::remove_var("INSIGHT_BASE_URL");
        env::remove_var("ANNOTATION_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = EndpointConfig::from_env().unwrap();

        assert_eq!(config, EndpointConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        clear_env();
        env::set_var("ANNOTATION_BASE_URL", "http://ai.internal/api/ai/");
        env::set_var("INSIGHT_BASE_URL", "http://insight.internal");
        env::set_var("ANNOTATION_TIMEOUT_SECS", "5");

        let config = EndpointConfig::from_env().unwrap();

        assert_eq!(config.base_url, "http://ai.internal/api/ai");
        assert_eq!(config.insight_base_url, "http://insight.internal");
        assert_eq!(config.timeout, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_timeout() {
        clear_env();
        env::set_var("ANNOTATION_TIMEOUT_SECS", "soon");

        assert!(EndpointConfig::from_env().is_err());
        clear_env();
    }
}
