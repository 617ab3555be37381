// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authentication.
//!
//! Two checks guard the webhook:
//! 1. the subscription handshake compares `hub.verify_token` with the
//!    configured verify token;
//! 2. event deliveries carry `X-Hub-Signature-256`, an HMAC-SHA256 of the raw
//!    body keyed with the app secret.
//!
//! Without a configured verify token the handshake is always refused. Without
//! an app secret deliveries are accepted unsigned.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Webhook secrets taken from configuration.
#[derive(Clone, Default)]
pub struct WebhookAuth {
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
}

impl std::fmt::Debug for WebhookAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuth")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl WebhookAuth {
    /// Whether a subscription handshake with `mode` and `token` is accepted.
    pub fn accepts_subscription(&self, mode: Option<&str>, token: Option<&str>) -> bool {
        let Some(expected) = self.verify_token.as_deref() else {
            return false;
        };
        mode == Some("subscribe") && !expected.is_empty() && token == Some(expected)
    }

    /// Whether a delivery with `signature_header` is authentic.
    pub fn accepts_delivery(&self, signature_header: Option<&str>, body: &[u8]) -> bool {
        match self.app_secret.as_deref() {
            None => true,
            Some(secret) => verify_signature(secret, signature_header, body),
        }
    }
}

/// Check an `X-Hub-Signature-256` header (`sha256=<hex>`) against `body`.
pub fn verify_signature(app_secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let hex_sig = header.trim();
    let hex_sig = hex_sig.strip_prefix("sha256=").unwrap_or(hex_sig);
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the header value a sender would attach to `body`.
pub fn sign(app_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
