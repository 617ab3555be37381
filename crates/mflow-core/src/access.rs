// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Who may see which pages and conversations.
//!
//! A super admin sees everything. An agent sees a page only when the page
//! lists the agent in its assigned agent ids. Assignments that point at
//! removed agents or pages simply never match.

use std::collections::HashSet;

use crate::types::{Agent, Conversation, Page};

/// Whether `viewer` may see `page`.
pub fn can_view_page(viewer: &Agent, page: &Page) -> bool {
    viewer.is_admin() || page.assigned_agent_ids.iter().any(|id| id == &viewer.id)
}

/// Ids of the pages visible to `viewer`.
pub fn visible_page_ids<'a>(viewer: &Agent, pages: &'a [Page]) -> HashSet<&'a str> {
    pages
        .iter()
        .filter(|p| can_view_page(viewer, p))
        .map(|p| p.id.as_str())
        .collect()
}

/// Conversations visible to `viewer`, in input order.
pub fn visible_conversations<'a>(
    viewer: &Agent,
    pages: &[Page],
    conversations: &'a [Conversation],
) -> Vec<&'a Conversation> {
    if viewer.is_admin() {
        return conversations.iter().collect();
    }
    let allowed = visible_page_ids(viewer, pages);
    conversations
        .iter()
        .filter(|c| allowed.contains(c.page_id.as_str()))
        .collect()
}
