// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph API gateway for MessengerFlow.
//!
//! Implements [`RemoteGateway`] against the Facebook Graph API: page listing,
//! conversation and message listing with pagination, the Send API, and page
//! token verification.

pub mod client;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mflow_config::model::GraphConfig;
use mflow_core::{
    AdapterType, Conversation, FlowError, HealthStatus, Message, MessageId, Page, PluginAdapter,
    RemoteGateway,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::client::{GraphClient, Reply};
use crate::types::{NodeId, SendRequest, SendResponse, WireConversation, WireMessage, WirePage};

const PAGE_FIELDS: &str = "id,name,category,access_token";
const CONVERSATION_FIELDS: &str = "id,updated_time,snippet,unread_count,participants";
const MESSAGE_FIELDS: &str = "id,message,from,created_time";

/// Remote gateway backed by the Graph API.
pub struct GraphGateway {
    client: GraphClient,
}

impl GraphGateway {
    pub fn new(config: &GraphConfig) -> Result<Self, FlowError> {
        let client = GraphClient::new(config)?;
        info!(api_base = %config.api_base, api_version = %config.api_version, "Graph gateway initialized");
        Ok(Self { client })
    }
}

/// Parse raw items, logging and dropping the ones that do not fit.
fn parse_items<W, T>(
    raw: Vec<serde_json::Value>,
    what: &'static str,
    convert: impl Fn(W) -> Result<T, FlowError>,
) -> Vec<T>
where
    W: DeserializeOwned,
{
    raw.into_iter()
        .filter_map(|value| {
            let parsed = serde_json::from_value::<W>(value)
                .map_err(FlowError::from)
                .and_then(&convert);
            match parsed {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(kind = what, error = %e, "dropping unparseable Graph item");
                    None
                }
            }
        })
        .collect()
}

fn token(credential: &str) -> (&'static str, String) {
    ("access_token", credential.to_string())
}

#[async_trait]
impl PluginAdapter for GraphGateway {
    fn name(&self) -> &str {
        "graph"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Remote
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for GraphGateway {
    async fn list_pages(&self, user_token: &str) -> Result<Vec<Page>, FlowError> {
        let raw = self
            .client
            .get_all("me/accounts", &[("fields", PAGE_FIELDS.into()), token(user_token)])
            .await?;
        let pages = parse_items(raw, "page", WirePage::into_page);
        debug!(count = pages.len(), "listed pages");
        Ok(pages)
    }

    async fn list_conversations(
        &self,
        page_id: &str,
        credential: &str,
    ) -> Result<Vec<Conversation>, FlowError> {
        let raw = self
            .client
            .get_all(
                &format!("{page_id}/conversations"),
                &[
                    ("fields", CONVERSATION_FIELDS.into()),
                    ("platform", "messenger".into()),
                    token(credential),
                ],
            )
            .await?;
        let conversations = parse_items(raw, "conversation", |w: WireConversation| {
            w.into_conversation(page_id)
        });
        debug!(page_id, count = conversations.len(), "listed conversations");
        Ok(conversations)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        page_id: &str,
        credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, FlowError> {
        let mut query = vec![("fields", MESSAGE_FIELDS.to_string()), token(credential)];
        if let Some(since) = since {
            query.push(("since", since.timestamp().to_string()));
        }
        let raw = self
            .client
            .get_all(&format!("{conversation_id}/messages"), &query)
            .await?;

        let mut messages = parse_items(raw, "message", |w: WireMessage| {
            w.into_message(conversation_id, page_id)
        });
        // The edge may ignore `since`; enforce it here.
        if let Some(since) = since {
            messages.retain(|m| m.timestamp >= since);
        }
        // Provider order is newest first.
        messages.reverse();
        messages.sort_by_key(|m| m.timestamp);
        debug!(conversation_id, count = messages.len(), "listed messages");
        Ok(messages)
    }

    async fn send(
        &self,
        recipient_customer_id: &str,
        text: &str,
        credential: &str,
    ) -> Result<MessageId, FlowError> {
        let reply: SendResponse = self
            .client
            .post(
                "me/messages",
                &[token(credential)],
                &SendRequest::response(recipient_customer_id, text),
            )
            .await?
            .into_result()?;
        debug!(message_id = %reply.message_id, "message sent");
        Ok(MessageId(reply.message_id))
    }

    async fn verify_credential(&self, page_id: &str, credential: &str) -> Result<bool, FlowError> {
        let reply: Reply<NodeId> = self
            .client
            .get(&self.client.url(page_id), &[("fields", "id".into()), token(credential)])
            .await?;
        match reply {
            Reply::Ok(node) => Ok(node.id == page_id),
            Reply::Rejected { error, .. } if error.error.is_auth_error() => {
                info!(page_id, message = %error.error.message, "page token rejected");
                Ok(false)
            }
            Reply::Rejected { error, .. } => Err(FlowError::remote(error.error.message)),
        }
    }
}
