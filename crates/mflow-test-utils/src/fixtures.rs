// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record builders with sensible defaults.

use chrono::{DateTime, TimeZone, Utc};
use mflow_core::{
    Agent, Conversation, ConversationStatus, Message, MessageOrigin, Page, Presence, Role,
};

/// A fixed instant, so tests do not depend on the wall clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// [`base_time`] shifted by `secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(secs)
}

pub fn page(id: &str, token: Option<&str>) -> Page {
    Page {
        id: id.to_string(),
        name: format!("Page {id}"),
        category: "Business".to_string(),
        is_connected: true,
        access_token: token.map(str::to_string),
        assigned_agent_ids: Vec::new(),
    }
}

pub fn conversation(id: &str, page_id: &str, customer_id: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        page_id: page_id.to_string(),
        customer_id: customer_id.to_string(),
        customer_name: format!("Customer {customer_id}"),
        customer_avatar: String::new(),
        customer_avatar_blob: None,
        last_message: String::new(),
        last_timestamp: base_time(),
        status: ConversationStatus::Open,
        assigned_agent_id: None,
        unread_count: 0,
    }
}

/// An authoritative message from the customer.
pub fn incoming(id: &str, conversation_id: &str, text: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: "customer".to_string(),
        sender_name: "Customer".to_string(),
        text: text.to_string(),
        timestamp: at(secs),
        is_incoming: true,
        is_read: false,
        origin: MessageOrigin::Authoritative,
        delivery_error: None,
    }
}

/// An authoritative message sent by the page.
pub fn outbound(id: &str, conversation_id: &str, text: &str, secs: i64) -> Message {
    Message {
        sender_id: "page".to_string(),
        sender_name: "Page".to_string(),
        is_incoming: false,
        is_read: true,
        ..incoming(id, conversation_id, text, secs)
    }
}

/// A locally inserted outbound message awaiting its echo.
pub fn optimistic(id: &str, conversation_id: &str, text: &str, secs: i64) -> Message {
    Message {
        origin: MessageOrigin::Optimistic,
        ..outbound(id, conversation_id, text, secs)
    }
}

/// An agent whose `password_hash` is left empty; the session gate sets real hashes.
pub fn agent(id: &str, role: Role) -> Agent {
    Agent {
        id: id.to_string(),
        name: format!("Agent {id}"),
        email: format!("{id}@example.com"),
        password_hash: String::new(),
        avatar: String::new(),
        role,
        status: Presence::Offline,
        assigned_page_ids: Vec::new(),
    }
}
