// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mflow.toml` > `~/.config/mflow/mflow.toml` > `/etc/mflow/mflow.toml`
//! with environment variable overrides via `MFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MflowConfig;

/// Config sections, in the order env keys are matched against.
const SECTIONS: &[&str] = &["app", "storage", "graph", "sync", "policy", "webhook"];

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/mflow/mflow.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "mflow.toml";

/// `~/.config/mflow/mflow.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mflow").join("mflow.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mflow/mflow.toml` (system-wide)
/// 3. `~/.config/mflow/mflow.toml` (user XDG config)
/// 4. `./mflow.toml` (local directory)
/// 5. `MFLOW_*` environment variables
pub fn load_config() -> Result<MflowConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MflowConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `MFLOW_SYNC_POLL_INTERVAL_SECS` maps to `sync.poll_interval_secs`.
fn env_provider() -> Env {
    Env::prefixed("MFLOW_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_after_section() {
        assert_eq!(map_env_key("sync_poll_interval_secs"), "sync.poll_interval_secs");
        assert_eq!(map_env_key("graph_user_access_token"), "graph.user_access_token");
        assert_eq!(map_env_key("webhook_app_secret"), "webhook.app_secret");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mflow.toml");
        std::fs::write(&path, "[sync]\npoll_interval_secs = 2\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.sync.poll_interval_secs, 2);
        assert_eq!(config.sync.delta_lookback_secs, 300);
    }
}
