use annotation_client::EndpointConfig;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_AUTOPILOT_DELAY_MS: u64 = 3000;
pub const DEFAULT_INSIGHT_WINDOW: usize = 10;
pub const DEFAULT_LOG_FILE: &str = "logs/chat-enrich.log";

/// Orchestrator configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichConfig {
    pub local_user_id: String,
    pub endpoints: EndpointConfig,
    /// Target language for automatic translation of remote messages. `None` disables it.
    pub preferred_language: Option<String>,
    pub autopilot_enabled: bool,
    pub autopilot_delay: Duration,
    /// Number of recent messages sent as auto-reply context. 0 sends an empty context.
    pub autopilot_context_limit: usize,
    pub insight_window: usize,
    pub log_file: String,
}

impl EnrichConfig {
    /// Defaults for everything except the local user id.
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            endpoints: EndpointConfig::default(),
            preferred_language: None,
            autopilot_enabled: false,
            autopilot_delay: Duration::from_millis(DEFAULT_AUTOPILOT_DELAY_MS),
            autopilot_context_limit: 0,
            insight_window: DEFAULT_INSIGHT_WINDOW,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }

    /// Loads configuration from the environment.
    /// `local_user_id` overrides `LOCAL_USER_ID` when given.
    pub fn load(local_user_id: Option<String>) -> Result<Self> {
        let local_user_id = match local_user_id {
            Some(id) => id,
            None => env::var("LOCAL_USER_ID").context("LOCAL_USER_ID not set")?,
        };
        let endpoints = EndpointConfig::from_env()?;
        let preferred_language = env::var("PREFERRED_LANGUAGE")
            .ok()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty());
        let autopilot_enabled = match env::var("AUTOPILOT_ENABLED") {
            Ok(raw) => parse_flag("AUTOPILOT_ENABLED", &raw)?,
            Err(_) => false,
        };
        let autopilot_delay_ms: u64 = parse_var("AUTOPILOT_DELAY_MS", DEFAULT_AUTOPILOT_DELAY_MS)?;
        let autopilot_context_limit: usize = parse_var("AUTOPILOT_CONTEXT_LIMIT", 0)?;
        let insight_window: usize = parse_var("INSIGHT_WINDOW", DEFAULT_INSIGHT_WINDOW)?;
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

        let config = Self {
            local_user_id,
            endpoints,
            preferred_language,
            autopilot_enabled,
            autopilot_delay: Duration::from_millis(autopilot_delay_ms),
            autopilot_context_limit,
            insight_window,
            log_file,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.local_user_id.trim().is_empty() {
            bail!("LOCAL_USER_ID must not be empty");
        }
        if self.insight_window == 0 {
            bail!("INSIGHT_WINDOW must be at least 1");
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} is not a valid number: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} is not a boolean: {}", name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "LOCAL_USER_ID",
            "ANNOTATION_BASE_URL",
            "INSIGHT_BASE_URL",
            "ANNOTATION_TIMEOUT_SECS",
            "PREFERRED_LANGUAGE",
            "AUTOPILOT_ENABLED",
            "AUTOPILOT_DELAY_MS",
            "AUTOPILOT_CONTEXT_LIMIT",
            "INSIGHT_WINDOW",
            "LOG_FILE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        clear_env();
        env::set_var("LOCAL_USER_ID", "me");

        let config = EnrichConfig::load(None).unwrap();

        assert_eq!(config, EnrichConfig::new("me"));
        assert_eq!(config.autopilot_delay, Duration::from_millis(3000));
        assert_eq!(config.insight_window, 10);
        assert!(config.preferred_language.is_none());
        assert!(!config.autopilot_enabled);
        assert_eq!(config.log_file, "logs/chat-enrich.log");
    }

    #[test]
    #[serial]
    fn test_load_config_with_custom_values() {
        clear_env();
        env::set_var("LOCAL_USER_ID", "me");
        env::set_var("PREFERRED_LANGUAGE", "fr");
        env::set_var("AUTOPILOT_ENABLED", "yes");
        env::set_var("AUTOPILOT_DELAY_MS", "500");
        env::set_var("AUTOPILOT_CONTEXT_LIMIT", "4");
        env::set_var("INSIGHT_WINDOW", "20");
        env::set_var("LOG_FILE", "/tmp/enrich.log");

        let config = EnrichConfig::load(None).unwrap();

        assert_eq!(config.preferred_language.as_deref(), Some("fr"));
        assert!(config.autopilot_enabled);
        assert_eq!(config.autopilot_delay, Duration::from_millis(500));
        assert_eq!(config.autopilot_context_limit, 4);
        assert_eq!(config.insight_window, 20);
        assert_eq!(config.log_file, "/tmp/enrich.log");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_override_user_and_blank_language() {
        clear_env();
        env::set_var("LOCAL_USER_ID", "env-user");
        env::set_var("PREFERRED_LANGUAGE", "  ");

        let config = EnrichConfig::load(Some("cli-user".to_string())).unwrap();

        assert_eq!(config.local_user_id, "cli-user");
        assert!(config.preferred_language.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_invalid_values() {
        clear_env();
        assert!(EnrichConfig::load(None).is_err());

        env::set_var("LOCAL_USER_ID", "me");
        env::set_var("AUTOPILOT_DELAY_MS", "soon");
        assert!(EnrichConfig::load(None).is_err());

        env::remove_var("AUTOPILOT_DELAY_MS");
        env::set_var("AUTOPILOT_ENABLED", "maybe");
        assert!(EnrichConfig::load(None).is_err());

        env::remove_var("AUTOPILOT_ENABLED");
        env::set_var("INSIGHT_WINDOW", "0");
        assert!(EnrichConfig::load(None).is_err());
        clear_env();
    }
}
