// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles GET /health, GET /webhook and POST /webhook.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use mflow_core::HealthStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::{self, WebhookPayload};
use crate::server::GatewayState;

/// Header carrying the HMAC of a webhook delivery.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` or `initializing_failed`.
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Query of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, reason) = match &state.init_error {
        Some(err) => ("initializing_failed", Some(err.clone())),
        None => match state.inbox.health().await {
            HealthStatus::Healthy => ("ok", None),
            HealthStatus::Degraded(r) => ("degraded", Some(r)),
            HealthStatus::Unhealthy(r) => ("initializing_failed", Some(r)),
        },
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reason,
    })
}

/// GET /webhook
///
/// Echoes `hub.challenge` when the handshake carries the configured token.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    if state
        .auth
        .accepts_subscription(query.mode.as_deref(), query.verify_token.as_deref())
    {
        info!("webhook subscription verified");
        (StatusCode::OK, query.challenge.unwrap_or_default()).into_response()
    } else {
        warn!(mode = ?query.mode, "webhook subscription rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /webhook
///
/// Acknowledges immediately; parsing and ingest run on a background task.
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !state.auth.accepts_delivery(signature, &body) {
        warn!("webhook delivery with bad signature rejected");
        return StatusCode::FORBIDDEN;
    }

    let inbox = state.inbox.clone();
    tokio::spawn(async move {
        let payload: WebhookPayload = match serde_json::from_slice(&body) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "malformed webhook payload dropped");
                return;
            }
        };
        let events = events::text_events(payload);
        if events.is_empty() {
            return;
        }
        let report = events::dispatch(&inbox, events).await;
        debug!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            superseded = report.superseded,
            "webhook events ingested"
        );
    });

    StatusCode::OK
}
