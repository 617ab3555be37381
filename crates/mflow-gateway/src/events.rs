// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messenger webhook payloads and their hand-off to the inbox.

use chrono::{DateTime, Utc};
use mflow_core::{Message, MessageOrigin};
use mflow_sync::{Inbox, IngestReport};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    /// The page the events belong to.
    pub id: String,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
pub struct Party {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Party,
    pub recipient: Party,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub mid: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
}

/// A text message event, with the customer it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub page_id: String,
    pub customer_id: String,
    pub message_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// `false` for echoes of messages the page sent.
    pub is_incoming: bool,
}

impl InboundEvent {
    fn into_message(self, conversation_id: String) -> Message {
        Message {
            id: self.message_id,
            conversation_id,
            sender_id: if self.is_incoming {
                self.customer_id
            } else {
                self.page_id.clone()
            },
            sender_name: if self.is_incoming {
                String::new()
            } else {
                self.page_id
            },
            text: self.text,
            timestamp: self.timestamp,
            is_incoming: self.is_incoming,
            is_read: !self.is_incoming,
            origin: MessageOrigin::Authoritative,
            delivery_error: None,
        }
    }
}

/// Text message events of a page payload. Other event kinds are dropped.
pub fn text_events(payload: WebhookPayload) -> Vec<InboundEvent> {
    if payload.object != "page" {
        debug!(object = %payload.object, "ignoring non-page webhook payload");
        return Vec::new();
    }

    let mut out = Vec::new();
    for entry in payload.entry {
        for event in entry.messaging {
            let Some(message) = event.message else {
                continue;
            };
            let Some(text) = message.text.filter(|t| !t.is_empty()) else {
                continue;
            };
            let customer_id = if message.is_echo {
                event.recipient.id
            } else {
                event.sender.id
            };
            let timestamp = event
                .timestamp
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_else(Utc::now);
            out.push(InboundEvent {
                page_id: entry.id.clone(),
                customer_id,
                message_id: message.mid,
                text,
                timestamp,
                is_incoming: !message.is_echo,
            });
        }
    }
    out
}

/// Resolve each event to a known conversation and ingest them as live traffic.
///
/// Events for conversations the inbox does not know yet are skipped; the next
/// full sync picks them up.
pub async fn dispatch(inbox: &Inbox, events: Vec<InboundEvent>) -> IngestReport {
    let mut batch = Vec::with_capacity(events.len());
    for event in events {
        match inbox.find_conversation(&event.page_id, &event.customer_id).await {
            Some(conversation) => batch.push(event.into_message(conversation.id)),
            None => warn!(
                page_id = %event.page_id,
                message_id = %event.message_id,
                "webhook event for unknown conversation, leaving it for the next sync"
            ),
        }
    }

    match inbox.ingest(batch, true).await {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "webhook ingest failed");
            IngestReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn incoming_and_echo_events_are_oriented() {
        let events = text_events(payload(serde_json::json!({
            "object": "page",
            "entry": [{
                "id": "p1",
                "time": 1772366400000_i64,
                "messaging": [
                    {
                        "sender": {"id": "u1"},
                        "recipient": {"id": "p1"},
                        "timestamp": 1772366400000_i64,
                        "message": {"mid": "m_in", "text": "hello"}
                    },
                    {
                        "sender": {"id": "p1"},
                        "recipient": {"id": "u1"},
                        "timestamp": 1772366460000_i64,
                        "message": {"mid": "m_out", "text": "hi!", "is_echo": true}
                    }
                ]
            }]
        })));

        assert_eq!(events.len(), 2);
        assert!(events[0].is_incoming);
        assert_eq!(events[0].customer_id, "u1");
        assert!(!events[1].is_incoming);
        assert_eq!(events[1].customer_id, "u1");
        assert_eq!(events[1].timestamp.timestamp(), 1_772_366_460);
    }

    #[test]
    fn non_text_and_non_page_events_are_dropped() {
        let events = text_events(payload(serde_json::json!({
            "object": "page",
            "entry": [{
                "id": "p1",
                "messaging": [
                    {"sender": {"id": "u1"}, "recipient": {"id": "p1"}, "delivery": {"mids": ["x"]}},
                    {"sender": {"id": "u1"}, "recipient": {"id": "p1"}, "message": {"mid": "m_att"}}
                ]
            }]
        })));
        assert!(events.is_empty());

        let other = text_events(payload(serde_json::json!({"object": "instagram", "entry": []})));
        assert!(other.is_empty());
    }
}
