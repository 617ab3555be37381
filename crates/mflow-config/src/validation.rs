// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. Every problem is
//! collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::MflowConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.delta_lookback_secs` (7 days).
pub const MAX_DELTA_LOOKBACK_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate a deserialized configuration.
pub fn validate_config(config: &MflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "app.log_level `{}` must be one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    let base = config.graph.api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "graph.api_base `{base}` must be an http(s) URL"
        )));
    }
    if config.graph.api_version.trim().is_empty() {
        errors.push(ConfigError::validation("graph.api_version must not be empty"));
    }
    if config.graph.timeout_secs == 0 {
        errors.push(ConfigError::validation("graph.timeout_secs must be greater than 0"));
    }

    if config.sync.poll_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "sync.poll_interval_secs must be greater than 0",
        ));
    }
    if config.sync.delta_lookback_secs == 0 {
        errors.push(ConfigError::validation(
            "sync.delta_lookback_secs must be greater than 0",
        ));
    } else if config.sync.delta_lookback_secs > MAX_DELTA_LOOKBACK_SECS {
        errors.push(ConfigError::validation(format!(
            "sync.delta_lookback_secs must be at most {MAX_DELTA_LOOKBACK_SECS} (7 days)"
        )));
    }

    let host = config.webhook.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("webhook.host must not be empty"));
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            errors.push(ConfigError::validation(format!(
                "webhook.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config
        .webhook
        .verify_token
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        errors.push(ConfigError::validation(
            "webhook.verify_token must not be blank when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MflowConfig::default()).is_ok());
    }

    #[test]
    fn zero_poll_interval_fails() {
        let mut config = MflowConfig::default();
        config.sync.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "poll_interval_secs"));
    }

    #[test]
    fn delta_lookback_is_bounded() {
        let mut config = MflowConfig::default();
        config.sync.delta_lookback_secs = MAX_DELTA_LOOKBACK_SECS;
        assert!(validate_config(&config).is_ok());

        config.sync.delta_lookback_secs = MAX_DELTA_LOOKBACK_SECS + 1;
        assert!(has_error(&validate_config(&config).unwrap_err(), "delta_lookback_secs"));

        config.sync.delta_lookback_secs = 10_000_000_000_000_000;
        assert!(has_error(&validate_config(&config).unwrap_err(), "delta_lookback_secs"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = MflowConfig::default();
        config.storage.database_path = " ".into();
        config.graph.api_base = "graph.facebook.com".into();
        config.webhook.host = "bad host!".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "database_path"));
        assert!(has_error(&errors, "api_base"));
        assert!(has_error(&errors, "webhook.host"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = MflowConfig::default();
        config.app.log_level = "verbose".into();
        assert!(has_error(&validate_config(&config).unwrap_err(), "log_level"));
    }

    #[test]
    fn blank_verify_token_fails() {
        let mut config = MflowConfig::default();
        config.webhook.verify_token = Some("".into());
        assert!(has_error(&validate_config(&config).unwrap_err(), "verify_token"));
    }
}
