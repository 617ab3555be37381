// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Graph API.
//!
//! Provides [`GraphClient`], which builds versioned URLs, follows
//! `paging.next` cursors, turns error bodies into [`FlowError::Remote`]
//! carrying the provider's message verbatim, and retries reads once on
//! transient statuses.

use std::time::Duration;

use mflow_config::model::GraphConfig;
use mflow_core::FlowError;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{Envelope, GraphErrorEnvelope};

/// Upper bound on followed `paging.next` links per listing.
const MAX_PAGES: usize = 50;

/// Outcome of a request that reached the provider.
pub enum Reply<T> {
    Ok(T),
    /// The provider answered with an error body.
    Rejected {
        status: StatusCode,
        error: GraphErrorEnvelope,
    },
}

/// Graph API client with connection pooling.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self, FlowError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FlowError::Remote {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.api_base.trim_end_matches('/'),
                config.api_version.trim_matches('/')
            ),
            max_retries: 1,
        })
    }

    /// Absolute URL of a versioned Graph path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a single node or edge page.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Reply<T>, FlowError> {
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url, "retrying Graph read after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(request_failed)?;
            let status = response.status();
            debug!(status = %status, attempt, "Graph read response received");

            if is_transient_error(status) && attempt < self.max_retries {
                continue;
            }
            let body = response.text().await.map_err(request_failed)?;
            return decode(status, &body);
        }

        Err(FlowError::remote("Graph read failed after retries"))
    }

    /// GET every item of an edge, following `paging.next`.
    ///
    /// Items are returned raw so the caller can drop the ones that fail
    /// to parse without losing the rest.
    pub async fn get_all(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, FlowError> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        let mut first = true;
        let mut pages = 0;

        while let Some(url) = next.take() {
            // `next` links already carry the original query.
            let query: &[(&str, String)] = if first { query } else { &[] };
            first = false;

            let envelope: Envelope = self.get(&url, query).await?.into_result()?;
            items.extend(envelope.data);
            pages += 1;

            next = envelope.paging.and_then(|p| p.next);
            if pages >= MAX_PAGES && next.is_some() {
                warn!(path, pages, "stopping pagination at page limit");
                break;
            }
        }

        debug!(path, pages, count = items.len(), "Graph listing complete");
        Ok(items)
    }

    /// POST a JSON body. Not retried: a write may have landed before the failure.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Reply<T>, FlowError> {
        let response = self
            .client
            .post(self.url(path))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(request_failed)?;
        let status = response.status();
        debug!(status = %status, path, "Graph write response received");
        let text = response.text().await.map_err(request_failed)?;
        decode(status, &text)
    }
}

impl<T> Reply<T> {
    /// Collapse a rejection into [`FlowError::Remote`] with the provider's message.
    pub fn into_result(self) -> Result<T, FlowError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Rejected { error, .. } => Err(FlowError::remote(error.error.message)),
        }
    }
}

/// Decode a response body.
///
/// A body carrying `error` is a rejection even under a 2xx status.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Reply<T>, FlowError> {
    if let Ok(error) = serde_json::from_str::<GraphErrorEnvelope>(body) {
        warn!(status = %status, code = ?error.error.code, "Graph rejected request");
        return Ok(Reply::Rejected { status, error });
    }
    if !status.is_success() {
        return Err(FlowError::remote(format!("Graph returned {status}: {body}")));
    }
    serde_json::from_str(body)
        .map(Reply::Ok)
        .map_err(|e| FlowError::MalformedPayload(format!("unexpected Graph response: {e}")))
}

fn request_failed(e: reqwest::Error) -> FlowError {
    FlowError::Remote {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Statuses worth one retry.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
