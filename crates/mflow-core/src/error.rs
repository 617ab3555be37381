// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the MessengerFlow sync core.

use thiserror::Error;

/// The primary error type used across adapter traits and core operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local store failures (database open, query failure, record encoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote messaging API failures (network, provider error payloads).
    ///
    /// `message` carries the provider's text verbatim so it can be shown to
    /// the agent as-is.
    #[error("remote error: {message}")]
    Remote {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound text contained URLs that are not on the approved list.
    #[error("policy violation: restricted URL(s) {}", urls.join(", "))]
    PolicyViolation { urls: Vec<String> },

    /// A referenced record does not exist in canonical state.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller supplied an unusable value (empty text, unknown role, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A provider or webhook payload could not be parsed into domain records.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FlowError::Storage {
            source: Box::new(err),
        }
    }

    /// Builds a remote failure carrying only a provider message.
    pub fn remote(message: impl Into<String>) -> Self {
        FlowError::Remote {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a not-found error for the given entity kind.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        FlowError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying later could succeed (network / provider hiccups).
    pub fn is_transient(&self) -> bool {
        matches!(self, FlowError::Remote { .. })
    }

    /// Whether this is a content-policy rejection rather than a delivery failure.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, FlowError::PolicyViolation { .. })
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::MalformedPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_violation_lists_urls() {
        let err = FlowError::PolicyViolation {
            urls: vec!["https://a.example".into(), "https://b.example".into()],
        };
        assert_eq!(
            err.to_string(),
            "policy violation: restricted URL(s) https://a.example, https://b.example"
        );
        assert!(err.is_policy_violation());
        assert!(!err.is_transient());
    }

    #[test]
    fn remote_errors_are_transient_and_verbatim() {
        let err = FlowError::remote("(#10) This message is sent outside of allowed window.");
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "remote error: (#10) This message is sent outside of allowed window."
        );
    }

    #[test]
    fn storage_wraps_source() {
        let err = FlowError::storage(std::io::Error::other("disk full"));
        assert!(err.to_string().contains("disk full"));
        assert!(!err.is_transient());
    }
}
