// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph API wire types and the parse step into domain records.
//!
//! Every field the provider may omit is optional here. Conversion into
//! [`Page`], [`Conversation`] and [`Message`] happens in one place and fails
//! with [`FlowError::MalformedPayload`] when a required piece is missing.

use chrono::{DateTime, NaiveDateTime, Utc};
use mflow_core::{Conversation, ConversationStatus, FlowError, Message, MessageOrigin, Page};
use serde::{Deserialize, Serialize};

// --- Envelopes ---

/// A page of an edge listing.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    /// Absolute URL of the next page, access token included.
    #[serde(default)]
    pub next: Option<String>,
}

/// `{"error": {...}}` body returned on failure.
#[derive(Debug, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

impl GraphErrorBody {
    /// OAuth errors (expired or revoked token, missing permission).
    pub fn is_auth_error(&self) -> bool {
        matches!(self.code, Some(102 | 190 | 200 | 10))
            || self.kind.as_deref() == Some("OAuthException")
    }
}

// --- Items ---

#[derive(Debug, Deserialize)]
pub struct WirePage {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub access_token: Option<String>,
}

impl WirePage {
    pub fn into_page(self) -> Result<Page, FlowError> {
        let id = required(self.id, "page.id")?;
        Ok(Page {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            category: self.category.unwrap_or_else(|| "Business".to_string()),
            is_connected: true,
            access_token: self.access_token,
            assigned_agent_ids: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireParticipant {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct WireConversation {
    pub id: Option<String>,
    pub updated_time: Option<String>,
    pub snippet: Option<String>,
    pub unread_count: Option<u32>,
    pub participants: Option<WireList<WireParticipant>>,
}

impl WireConversation {
    /// The customer is the first participant that is not the page itself.
    pub fn into_conversation(self, page_id: &str) -> Result<Conversation, FlowError> {
        let id = required(self.id, "conversation.id")?;
        let customer = self
            .participants
            .map(|p| p.data)
            .unwrap_or_default()
            .into_iter()
            .find(|p| p.id.as_deref().is_some_and(|pid| pid != page_id))
            .ok_or_else(|| {
                FlowError::MalformedPayload(format!("conversation {id} has no customer participant"))
            })?;
        let customer_id = required(customer.id, "participant.id")?;
        let last_timestamp = self
            .updated_time
            .as_deref()
            .and_then(parse_graph_time)
            .ok_or_else(|| {
                FlowError::MalformedPayload(format!("conversation {id} has no valid updated_time"))
            })?;

        Ok(Conversation {
            customer_name: customer.name.unwrap_or_else(|| customer_id.clone()),
            id,
            page_id: page_id.to_string(),
            customer_id,
            customer_avatar: String::new(),
            customer_avatar_blob: None,
            last_message: self.snippet.unwrap_or_default(),
            last_timestamp,
            status: ConversationStatus::Open,
            assigned_agent_id: None,
            unread_count: self.unread_count.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub id: Option<String>,
    pub message: Option<String>,
    pub from: Option<WireParticipant>,
    pub created_time: Option<String>,
}

impl WireMessage {
    /// Anything not sent by `page_id` is incoming.
    pub fn into_message(self, conversation_id: &str, page_id: &str) -> Result<Message, FlowError> {
        let id = required(self.id, "message.id")?;
        let from = self
            .from
            .ok_or_else(|| FlowError::MalformedPayload(format!("message {id} has no sender")))?;
        let sender_id = required(from.id, "message.from.id")?;
        let timestamp = self
            .created_time
            .as_deref()
            .and_then(parse_graph_time)
            .ok_or_else(|| {
                FlowError::MalformedPayload(format!("message {id} has no valid created_time"))
            })?;
        let is_incoming = sender_id != page_id;

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            sender_name: from.name.unwrap_or_else(|| sender_id.clone()),
            sender_id,
            text: self.message.unwrap_or_default(),
            timestamp,
            is_incoming,
            is_read: !is_incoming,
            origin: MessageOrigin::Authoritative,
            delivery_error: None,
        })
    }
}

// --- Send API ---

#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub recipient: Recipient<'a>,
    pub message: TextBody<'a>,
    pub messaging_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TextBody<'a> {
    pub text: &'a str,
}

impl<'a> SendRequest<'a> {
    /// A reply inside the standard messaging window.
    pub fn response(recipient_id: &'a str, text: &'a str) -> Self {
        Self {
            recipient: Recipient { id: recipient_id },
            message: TextBody { text },
            messaging_type: "RESPONSE",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub message_id: String,
}

/// Node lookup used to verify a page token.
#[derive(Debug, Deserialize)]
pub struct NodeId {
    pub id: String,
}

// --- Helpers ---

fn required(value: Option<String>, field: &str) -> Result<String, FlowError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FlowError::MalformedPayload(format!("missing {field}")))
}

/// Parse a Graph timestamp.
///
/// Graph uses `2026-03-01T12:00:00+0000`; RFC 3339 and unix seconds are
/// accepted too because webhook payloads and test fixtures use them.
pub fn parse_graph_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parses_graph_offset_format() {
        let t = parse_graph_time("2026-03-01T12:00:00+0000").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(parse_graph_time("2026-03-01T13:00:00+01:00"), Some(t));
        assert_eq!(parse_graph_time("1772366400"), Some(t));
        assert!(parse_graph_time("yesterday").is_none());
    }

    #[test]
    fn page_defaults_category() {
        let wire: WirePage =
            serde_json::from_value(json!({"id": "p1", "name": "Shop", "access_token": "tok"}))
                .unwrap();
        let page = wire.into_page().unwrap();
        assert_eq!(page.category, "Business");
        assert!(page.is_connected);
        assert_eq!(page.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn conversation_picks_non_page_participant() {
        let wire: WireConversation = serde_json::from_value(json!({
            "id": "t_1",
            "updated_time": "2026-03-01T12:00:00+0000",
            "snippet": "hello",
            "participants": {"data": [
                {"id": "p1", "name": "Shop"},
                {"id": "u7", "name": "Ana"}
            ]}
        }))
        .unwrap();
        let conv = wire.into_conversation("p1").unwrap();
        assert_eq!(conv.customer_id, "u7");
        assert_eq!(conv.customer_name, "Ana");
        assert_eq!(conv.last_message, "hello");
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[test]
    fn message_direction_follows_page_id() {
        let from_page: WireMessage = serde_json::from_value(json!({
            "id": "m1", "message": "hi", "from": {"id": "p1", "name": "Shop"},
            "created_time": "2026-03-01T12:00:00+0000"
        }))
        .unwrap();
        let msg = from_page.into_message("t_1", "p1").unwrap();
        assert!(!msg.is_incoming);
        assert!(msg.is_read);

        let from_customer: WireMessage = serde_json::from_value(json!({
            "id": "m2", "message": "yo", "from": {"id": "u7"},
            "created_time": "2026-03-01T12:00:05+0000"
        }))
        .unwrap();
        let msg = from_customer.into_message("t_1", "p1").unwrap();
        assert!(msg.is_incoming);
        assert!(!msg.is_read);
        assert_eq!(msg.sender_name, "u7");
    }

    #[test]
    fn message_without_sender_is_malformed() {
        let wire: WireMessage = serde_json::from_value(json!({
            "id": "m1", "message": "hi", "created_time": "2026-03-01T12:00:00+0000"
        }))
        .unwrap();
        assert!(matches!(
            wire.into_message("t_1", "p1"),
            Err(FlowError::MalformedPayload(_))
        ));
    }

    #[test]
    fn send_request_shape() {
        let body = serde_json::to_value(SendRequest::response("u7", "hello")).unwrap();
        assert_eq!(
            body,
            json!({"recipient": {"id": "u7"}, "message": {"text": "hello"}, "messaging_type": "RESPONSE"})
        );
    }
}
