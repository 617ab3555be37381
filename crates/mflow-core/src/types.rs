// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared by the store, the remote gateway and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a message assigned by the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks and the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational, but in-memory and durable state may have diverged.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Remote,
}

/// Role of a console user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    SuperAdmin,
    Agent,
}

/// Presence of a console user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Presence {
    Online,
    Busy,
    #[default]
    Offline,
}

/// A support agent or administrator.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string of the agent's secret.
    pub password_hash: String,
    #[serde(default)]
    pub avatar: String,
    pub role: Role,
    #[serde(default)]
    pub status: Presence,
    /// Pages this agent works on (meaningful for [`Role::Agent`]).
    #[serde(default)]
    pub assigned_page_ids: Vec<String>,
}

impl Agent {
    pub fn is_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("role", &self.role)
            .field("status", &self.status)
            .field("assigned_page_ids", &self.assigned_page_ids)
            .finish()
    }
}

/// A linked business page.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Remote page id; globally unique.
    pub id: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_connected: bool,
    /// Page access token. `None` for simulated pages that never talk to the provider.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub assigned_agent_ids: Vec<String>,
}

fn default_category() -> String {
    "Business".to_string()
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("is_connected", &self.is_connected)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("assigned_agent_ids", &self.assigned_agent_ids)
            .finish()
    }
}

/// Workflow status of a conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ConversationStatus {
    #[default]
    Open,
    Pending,
    Resolved,
}

/// A customer thread on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub page_id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_avatar: String,
    /// Locally cached avatar bytes; preferred over the URL once present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_avatar_blob: Option<Vec<u8>>,
    #[serde(default)]
    pub last_message: String,
    pub last_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Where the avatar for a conversation should be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource<'a> {
    Blob(&'a [u8]),
    Url(&'a str),
}

impl Conversation {
    pub fn avatar(&self) -> AvatarSource<'_> {
        match &self.customer_avatar_blob {
            Some(blob) => AvatarSource::Blob(blob),
            None => AvatarSource::Url(&self.customer_avatar),
        }
    }
}

/// Whether a message was synthesized locally or confirmed by the provider.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageOrigin {
    /// Inserted before remote confirmation; replaced once the echo arrives.
    Optimistic,
    #[default]
    Authoritative,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// `true` when sent by the customer, `false` when sent by the page.
    pub is_incoming: bool,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub origin: MessageOrigin,
    /// Provider error recorded when an optimistic send failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

impl Message {
    pub fn is_optimistic(&self) -> bool {
        self.origin == MessageOrigin::Optimistic
    }

    pub fn is_outbound(&self) -> bool {
        !self.is_incoming
    }
}

/// An approved outbound link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedLink {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
}

/// Kind of an approved media asset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MediaType {
    Image,
    Video,
    File,
}

/// An approved outbound media asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedMedia {
    pub id: String,
    pub title: String,
    pub url: String,
    pub media_type: MediaType,
}

/// Per-page sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMarker {
    /// The page id this marker belongs to.
    pub id: String,
    pub history_synced: bool,
    #[serde(default)]
    pub last_full_sync: Option<DateTime<Utc>>,
}

/// Durable pointer to the logged-in agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPointer {
    pub id: String,
    pub agent_id: String,
    pub since: DateTime<Utc>,
}

impl SessionPointer {
    /// There is only ever one session pointer; it lives under this key.
    pub const KEY: &'static str = "current";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_uses_screaming_case_on_the_wire() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        assert_eq!(Role::from_str("agent").unwrap(), Role::Agent);
    }

    #[test]
    fn conversation_status_defaults_to_open() {
        assert_eq!(ConversationStatus::default(), ConversationStatus::Open);
        assert_eq!(ConversationStatus::Resolved.to_string(), "RESOLVED");
    }

    #[test]
    fn message_origin_defaults_to_authoritative_when_absent() {
        let json = r#"{
            "id": "m1",
            "conversation_id": "c1",
            "sender_id": "cust",
            "sender_name": "Jane",
            "text": "hello",
            "timestamp": "2026-01-01T00:00:00Z",
            "is_incoming": true
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.origin, MessageOrigin::Authoritative);
        assert!(!msg.is_read);
        assert!(msg.delivery_error.is_none());
    }

    #[test]
    fn avatar_blob_takes_precedence() {
        let mut conv = Conversation {
            id: "c1".into(),
            page_id: "p1".into(),
            customer_id: "u1".into(),
            customer_name: "Jane".into(),
            customer_avatar: "https://cdn.example/a.png".into(),
            customer_avatar_blob: None,
            last_message: String::new(),
            last_timestamp: Utc::now(),
            status: ConversationStatus::Open,
            assigned_agent_id: None,
            unread_count: 0,
        };
        assert_eq!(conv.avatar(), AvatarSource::Url("https://cdn.example/a.png"));
        conv.customer_avatar_blob = Some(vec![1, 2, 3]);
        assert_eq!(conv.avatar(), AvatarSource::Blob(&[1, 2, 3]));
    }

    #[test]
    fn debug_redacts_secrets() {
        let page = Page {
            id: "p1".into(),
            name: "Shop".into(),
            category: "Retail".into(),
            is_connected: true,
            access_token: Some("EAAB-secret".into()),
            assigned_agent_ids: vec![],
        };
        let out = format!("{page:?}");
        assert!(!out.contains("EAAB-secret"));
        assert!(out.contains("[redacted]"));
    }
}
