// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-in-time copy of the inbox used by read-only consumers.

use crate::types::{Conversation, Message, Page};

/// A consistent view of pages, conversations and messages.
///
/// Taken under one read lock, so the three collections agree with each other.
#[derive(Debug, Clone, Default)]
pub struct InboxSnapshot {
    pub pages: Vec<Page>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
}

impl InboxSnapshot {
    /// Messages of one conversation, in chronological order.
    pub fn thread(&self, conversation_id: &str) -> Vec<&Message> {
        let mut thread: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect();
        thread.sort_by_key(|m| m.timestamp);
        thread
    }
}
