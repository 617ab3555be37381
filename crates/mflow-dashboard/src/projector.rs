// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The aggregate projector.

use chrono::{DateTime, Days, Utc};
use mflow_core::access::visible_conversations;
use mflow_core::{Agent, Conversation, ConversationStatus, InboxSnapshot};
use serde::Serialize;

/// Days covered by [`DashboardStats::chart`].
const CHART_DAYS: u64 = 7;

/// Offset added to the resolved ratio; the score is a placeholder, not a survey result.
const CSAT_BASELINE: u32 = 70;

/// Conversation count for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Short weekday name (`Mon`, `Tue`, ...).
    pub label: String,
    pub count: usize,
}

/// Headline numbers of the dashboard for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub open_chats: usize,
    /// Currently resolved conversations (lifetime count).
    pub resolved_today: usize,
    /// Mean reply latency, `"{m}m {s}s"`, or `"0m"` without any reply.
    pub avg_response_time: String,
    /// Heuristic satisfaction percentage, e.g. `"85%"`.
    pub csat: String,
    /// Oldest day first, ending today.
    pub chart: Vec<ChartPoint>,
}

/// Compute the dashboard for `viewer` as of `now`.
pub fn project(snapshot: &InboxSnapshot, viewer: &Agent, now: DateTime<Utc>) -> DashboardStats {
    let visible = visible_conversations(viewer, &snapshot.pages, &snapshot.conversations);

    let open_chats = count_status(&visible, ConversationStatus::Open);
    let resolved = count_status(&visible, ConversationStatus::Resolved);

    DashboardStats {
        open_chats,
        resolved_today: resolved,
        avg_response_time: format_response_time(mean_response_ms(snapshot, &visible)),
        csat: csat(resolved, visible.len()),
        chart: chart(&visible, now),
    }
}

fn count_status(conversations: &[&Conversation], status: ConversationStatus) -> usize {
    conversations.iter().filter(|c| c.status == status).count()
}

/// Mean delay between an incoming message and the outgoing one right after it.
fn mean_response_ms(snapshot: &InboxSnapshot, visible: &[&Conversation]) -> Option<i64> {
    let mut total_ms: i64 = 0;
    let mut replies: i64 = 0;

    for conv in visible {
        let thread = snapshot.thread(&conv.id);
        for pair in thread.windows(2) {
            if pair[0].is_incoming && !pair[1].is_incoming {
                total_ms += (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
                replies += 1;
            }
        }
    }

    (replies > 0).then(|| total_ms / replies)
}

/// Render a mean latency in milliseconds as `"{m}m {s}s"`.
pub fn format_response_time(mean_ms: Option<i64>) -> String {
    match mean_ms {
        Some(ms) if ms > 0 => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000),
        _ => "0m".to_string(),
    }
}

fn csat(resolved: usize, total: usize) -> String {
    if total == 0 {
        return "100%".to_string();
    }
    let ratio = (resolved as f64 / total as f64 * 100.0).round() as u32;
    format!("{}%", (ratio + CSAT_BASELINE).min(100))
}

fn chart(visible: &[&Conversation], now: DateTime<Utc>) -> Vec<ChartPoint> {
    let today = now.date_naive();
    (0..CHART_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|day| ChartPoint {
            label: day.format("%a").to_string(),
            count: visible
                .iter()
                .filter(|c| c.last_timestamp.date_naive() == day)
                .count(),
        })
        .collect()
}
