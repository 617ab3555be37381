// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for MessengerFlow.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level MessengerFlow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MflowConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Local store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Graph API settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Polling and reconciliation settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Outbound content policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// HTTP endpoint (health, webhook, static files).
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs and the health payload.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_app_name() -> String {
    "mflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file. `:memory:` selects the in-memory store.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mflow").join("mflow.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "mflow.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Graph API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Base URL of the Graph API, without the version segment.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Graph API version segment, e.g. `v22.0`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// User access token from the login handshake. Used by `connect`.
    #[serde(default)]
    pub user_access_token: Option<String>,

    /// Per-request timeout for Graph calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            user_access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field(
                "user_access_token",
                &self.user_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v22.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Polling and reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Seconds between delta syncs of an open conversation.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Look-back window for delta syncs of pages without a full history sync.
    #[serde(default = "default_delta_lookback_secs")]
    pub delta_lookback_secs: u64,

    /// Ingest the id returned by a successful send as the authoritative record.
    #[serde(default = "default_ingest_send_receipts")]
    pub ingest_send_receipts: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            delta_lookback_secs: default_delta_lookback_secs(),
            ingest_send_receipts: default_ingest_send_receipts(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_delta_lookback_secs() -> u64 {
    300
}

fn default_ingest_send_receipts() -> bool {
    true
}

/// Outbound content policy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Let super admins send URLs that are not on the approved lists.
    #[serde(default)]
    pub admin_bypass: bool,
}

/// HTTP endpoint configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Token echoed back during the provider's subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret used to check `X-Hub-Signature-256`. `None` skips the check.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Directory of a built console UI to serve, with SPA fallback.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            verify_token: None,
            app_secret: None,
            static_dir: None,
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
