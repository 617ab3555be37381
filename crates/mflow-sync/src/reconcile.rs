// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical in-memory state and the merge rules applied to it.
//!
//! Everything here is synchronous and side-effect free apart from mutating
//! [`InboxState`]. Each mutation returns a [`WritePlan`] describing the store
//! writes that mirror it, in the order they must be applied.

use std::collections::{HashMap, HashSet};

use mflow_core::record::{Record, encode};
use mflow_core::{
    ApprovedLink, ApprovedMedia, Conversation, FlowError, InboxSnapshot, Message, Page,
    StoredRecord, SyncMarker, Table,
};
use tracing::warn;

/// Outcome counters of one ingest call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Messages added to canonical state.
    pub inserted: usize,
    /// Messages skipped because their id was already present.
    pub duplicates: usize,
    /// Optimistic messages removed by an authoritative echo.
    pub superseded: usize,
    /// Messages skipped because their conversation is unknown.
    pub orphaned: usize,
}

impl IngestReport {
    pub fn absorb(&mut self, other: IngestReport) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.superseded += other.superseded;
        self.orphaned += other.orphaned;
    }
}

/// One store write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(Table, StoredRecord),
    Delete(Table, String),
    Clear(Table),
}

/// Ordered store writes mirroring one in-memory mutation.
#[derive(Debug, Default)]
pub struct WritePlan {
    ops: Vec<WriteOp>,
}

impl WritePlan {
    pub fn put<T: Record>(&mut self, record: &T) -> Result<(), FlowError> {
        self.ops.push(WriteOp::Put(T::TABLE, encode(record)?));
        Ok(())
    }

    pub fn delete<T: Record>(&mut self, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete(T::TABLE, id.into()));
    }

    pub fn clear(&mut self, table: Table) {
        self.ops.push(WriteOp::Clear(table));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Canonical state owned by the engine.
#[derive(Debug, Default)]
pub struct InboxState {
    pub pages: Vec<Page>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
    pub links: Vec<ApprovedLink>,
    pub media: Vec<ApprovedMedia>,
    pub markers: HashMap<String, SyncMarker>,
    message_ids: HashSet<String>,
}

impl InboxState {
    pub fn new(
        pages: Vec<Page>,
        conversations: Vec<Conversation>,
        messages: Vec<Message>,
        links: Vec<ApprovedLink>,
        media: Vec<ApprovedMedia>,
        markers: Vec<SyncMarker>,
    ) -> Self {
        let message_ids = messages.iter().map(|m| m.id.clone()).collect();
        Self {
            pages,
            conversations,
            messages,
            links,
            media,
            markers: markers.into_iter().map(|m| (m.id.clone(), m)).collect(),
            message_ids,
        }
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn contains_message(&self, id: &str) -> bool {
        self.message_ids.contains(id)
    }

    pub fn history_synced(&self, page_id: &str) -> bool {
        self.markers.get(page_id).is_some_and(|m| m.history_synced)
    }

    /// Messages of one conversation, in chronological order.
    pub fn thread(&self, conversation_id: &str) -> Vec<Message> {
        let mut thread: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        thread.sort_by_key(|m| m.timestamp);
        thread
    }

    pub fn snapshot(&self) -> InboxSnapshot {
        InboxSnapshot {
            pages: self.pages.clone(),
            conversations: self.conversations.clone(),
            messages: self.messages.clone(),
        }
    }

    /// Drop every conversation, message and sync marker.
    pub fn clear_threads(&mut self) {
        self.conversations.clear();
        self.messages.clear();
        self.message_ids.clear();
        self.markers.clear();
    }

    /// Merge a batch of messages.
    ///
    /// Rules, applied per message in batch order:
    /// 1. an id already present is a duplicate and is skipped;
    /// 2. a message whose conversation is unknown is skipped;
    /// 3. an authoritative outbound message first removes every optimistic
    ///    outbound message of the same conversation with identical text;
    /// 4. the message is inserted; when `count_unread` is set, an incoming
    ///    unread message bumps the conversation's unread counter.
    ///
    /// Each conversation that received an insert takes its summary from the
    /// last inserted message of the batch. Writes are planned as message
    /// deletes, then message puts, then conversation summaries.
    pub fn apply_batch(
        &mut self,
        batch: Vec<Message>,
        count_unread: bool,
    ) -> Result<(WritePlan, IngestReport), FlowError> {
        let mut report = IngestReport::default();
        let mut deleted: Vec<String> = Vec::new();
        let mut inserted: Vec<Message> = Vec::new();
        let mut touched: HashMap<String, (String, chrono::DateTime<chrono::Utc>)> = HashMap::new();

        for msg in batch {
            if self.message_ids.contains(&msg.id) {
                report.duplicates += 1;
                continue;
            }
            let Some(conv) = self.conversations.iter_mut().find(|c| c.id == msg.conversation_id)
            else {
                warn!(message_id = %msg.id, conversation_id = %msg.conversation_id, "skipping orphan message");
                report.orphaned += 1;
                continue;
            };

            if !msg.is_optimistic() && msg.is_outbound() {
                let stale: Vec<String> = self
                    .messages
                    .iter()
                    .filter(|m| {
                        m.is_optimistic()
                            && m.is_outbound()
                            && m.conversation_id == msg.conversation_id
                            && m.text == msg.text
                    })
                    .map(|m| m.id.clone())
                    .collect();
                if !stale.is_empty() {
                    self.messages.retain(|m| !stale.contains(&m.id));
                    inserted.retain(|m| !stale.contains(&m.id));
                    for id in &stale {
                        self.message_ids.remove(id);
                    }
                    report.superseded += stale.len();
                    deleted.extend(stale);
                }
            }

            if count_unread && msg.is_incoming && !msg.is_read {
                conv.unread_count = conv.unread_count.saturating_add(1);
            }
            touched.insert(conv.id.clone(), (msg.text.clone(), msg.timestamp));

            self.message_ids.insert(msg.id.clone());
            self.messages.push(msg.clone());
            inserted.push(msg);
            report.inserted += 1;
        }

        let mut plan = WritePlan::default();
        for id in deleted {
            plan.delete::<Message>(id);
        }
        for msg in &inserted {
            plan.put(&*msg)?;
        }
        for conv in self.conversations.iter_mut() {
            if let Some((text, ts)) = touched.remove(&conv.id) {
                conv.last_message = text;
                conv.last_timestamp = ts;
                plan.put(&*conv)?;
            }
        }

        Ok((plan, report))
    }

    /// Reset every conversation summary of `page_id` to its true latest message.
    pub fn rederive_summaries(&mut self, page_id: &str) -> Result<WritePlan, FlowError> {
        let mut latest: HashMap<&str, &Message> = HashMap::new();
        for msg in &self.messages {
            latest
                .entry(msg.conversation_id.as_str())
                .and_modify(|cur| {
                    if msg.timestamp >= cur.timestamp {
                        *cur = msg;
                    }
                })
                .or_insert(msg);
        }

        let mut plan = WritePlan::default();
        for conv in self.conversations.iter_mut().filter(|c| c.page_id == page_id) {
            let Some(msg) = latest.get(conv.id.as_str()) else {
                continue;
            };
            if conv.last_message != msg.text || conv.last_timestamp != msg.timestamp {
                conv.last_message = msg.text.clone();
                conv.last_timestamp = msg.timestamp;
                plan.put(&*conv)?;
            }
        }
        Ok(plan)
    }

    /// Merge a remote conversation listing.
    ///
    /// Customer fields come from the remote side; status, assignment, unread
    /// count, cached avatar and summary are kept for known conversations.
    pub fn merge_conversations(
        &mut self,
        remote: Vec<Conversation>,
    ) -> Result<WritePlan, FlowError> {
        let mut plan = WritePlan::default();
        for incoming in remote {
            match self.conversation_mut(&incoming.id) {
                Some(existing) => {
                    let before = existing.clone();
                    existing.page_id = incoming.page_id;
                    existing.customer_id = incoming.customer_id;
                    existing.customer_name = incoming.customer_name;
                    if !incoming.customer_avatar.is_empty() {
                        existing.customer_avatar = incoming.customer_avatar;
                    }
                    if *existing != before {
                        plan.put(&*existing)?;
                    }
                }
                None => {
                    plan.put(&incoming)?;
                    self.conversations.push(incoming);
                }
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use mflow_core::{ConversationStatus, MessageOrigin};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_772_366_400 + secs, 0).unwrap()
    }

    fn conv(id: &str) -> Conversation {
        Conversation {
            id: id.into(),
            page_id: "p1".into(),
            customer_id: format!("cust-{id}"),
            customer_name: "Customer".into(),
            customer_avatar: String::new(),
            customer_avatar_blob: None,
            last_message: String::new(),
            last_timestamp: at(0),
            status: ConversationStatus::Open,
            assigned_agent_id: None,
            unread_count: 0,
        }
    }

    fn msg(id: &str, conv: &str, text: &str, incoming: bool, secs: i64) -> Message {
        Message {
            id: id.into(),
            conversation_id: conv.into(),
            sender_id: if incoming { "cust".into() } else { "p1".into() },
            sender_name: "x".into(),
            text: text.into(),
            timestamp: at(secs),
            is_incoming: incoming,
            is_read: !incoming,
            origin: MessageOrigin::Authoritative,
            delivery_error: None,
        }
    }

    fn optimistic(id: &str, conv: &str, text: &str, secs: i64) -> Message {
        Message {
            origin: MessageOrigin::Optimistic,
            ..msg(id, conv, text, false, secs)
        }
    }

    fn state() -> InboxState {
        InboxState::new(vec![], vec![conv("c1"), conv("c2")], vec![], vec![], vec![], vec![])
    }

    #[test]
    fn duplicate_ids_are_skipped() {
        let mut st = state();
        let batch = vec![msg("m1", "c1", "hi", true, 1)];
        let (_, first) = st.apply_batch(batch.clone(), true).unwrap();
        let (plan, second) = st.apply_batch(batch, true).unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(second.duplicates, 1);
        assert!(plan.is_empty());
        assert_eq!(st.messages.len(), 1);
        assert_eq!(st.conversation("c1").unwrap().unread_count, 1);
    }

    #[test]
    fn echo_supersedes_optimistic() {
        let mut st = state();
        st.apply_batch(vec![optimistic("local-1", "c1", "On it", 1)], false).unwrap();
        let (plan, report) = st
            .apply_batch(vec![msg("m_9", "c1", "On it", false, 2)], true)
            .unwrap();

        assert_eq!(report.superseded, 1);
        assert_eq!(st.messages.len(), 1);
        assert_eq!(st.messages[0].id, "m_9");
        assert!(!st.contains_message("local-1"));
        assert!(matches!(&plan.ops()[0], WriteOp::Delete(Table::Messages, id) if id == "local-1"));
    }

    #[test]
    fn echo_leaves_other_conversations_and_texts_alone() {
        let mut st = state();
        st.apply_batch(
            vec![
                optimistic("local-1", "c1", "On it", 1),
                optimistic("local-2", "c1", "Something else", 2),
                optimistic("local-3", "c2", "On it", 3),
            ],
            false,
        )
        .unwrap();
        let (_, report) = st
            .apply_batch(vec![msg("m_9", "c1", "On it", false, 4)], true)
            .unwrap();
        assert_eq!(report.superseded, 1);
        let ids: Vec<_> = st.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["local-2", "local-3", "m_9"]);
    }

    #[test]
    fn identical_incoming_texts_are_kept() {
        let mut st = state();
        let (_, report) = st
            .apply_batch(
                vec![msg("m1", "c1", "hello", true, 1), msg("m2", "c1", "hello", true, 2)],
                true,
            )
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.superseded, 0);
        assert_eq!(st.conversation("c1").unwrap().unread_count, 2);
    }

    #[test]
    fn summary_is_last_of_batch_even_if_older() {
        let mut st = state();
        st.apply_batch(vec![msg("m1", "c1", "newest", true, 100)], true).unwrap();
        st.apply_batch(
            vec![msg("m2", "c1", "older a", true, 10), msg("m3", "c1", "older b", true, 20)],
            true,
        )
        .unwrap();
        let c = st.conversation("c1").unwrap();
        assert_eq!(c.last_message, "older b");
        assert_eq!(c.last_timestamp, at(20));

        st.rederive_summaries("p1").unwrap();
        let c = st.conversation("c1").unwrap();
        assert_eq!(c.last_message, "newest");
        assert_eq!(c.last_timestamp, at(100));
    }

    #[test]
    #[tracing_test::traced_test]
    fn orphans_are_counted_not_inserted() {
        let mut st = state();
        let (plan, report) = st
            .apply_batch(vec![msg("m1", "ghost", "boo", true, 1)], true)
            .unwrap();
        assert_eq!(report.orphaned, 1);
        assert!(plan.is_empty());
        assert!(st.messages.is_empty());
        assert!(logs_contain("skipping orphan message"));
    }

    #[test]
    fn history_ingest_does_not_count_unread() {
        let mut st = state();
        st.apply_batch(vec![msg("m1", "c1", "old", true, 1)], false).unwrap();
        assert_eq!(st.conversation("c1").unwrap().unread_count, 0);
    }

    #[test]
    fn plan_orders_deletes_then_messages_then_summaries() {
        let mut st = state();
        st.apply_batch(vec![optimistic("local-1", "c1", "ok", 1)], false).unwrap();
        let (plan, _) = st
            .apply_batch(vec![msg("m_1", "c1", "ok", false, 2), msg("m_2", "c2", "yo", true, 3)], true)
            .unwrap();
        let kinds: Vec<_> = plan
            .ops()
            .iter()
            .map(|op| match op {
                WriteOp::Delete(t, _) | WriteOp::Clear(t) => (*t, "del"),
                WriteOp::Put(t, _) => (*t, "put"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                (Table::Messages, "del"),
                (Table::Messages, "put"),
                (Table::Messages, "put"),
                (Table::Conversations, "put"),
                (Table::Conversations, "put"),
            ]
        );
    }

    #[test]
    fn merge_keeps_local_workflow_fields() {
        let mut st = state();
        {
            let c = st.conversation_mut("c1").unwrap();
            c.status = ConversationStatus::Resolved;
            c.assigned_agent_id = Some("a1".into());
            c.unread_count = 4;
        }
        let mut remote = conv("c1");
        remote.customer_name = "Renamed".into();
        let mut fresh = conv("c3");
        fresh.unread_count = 2;

        let plan = st.merge_conversations(vec![remote, fresh]).unwrap();
        assert_eq!(plan.len(), 2);
        let c1 = st.conversation("c1").unwrap();
        assert_eq!(c1.customer_name, "Renamed");
        assert_eq!(c1.status, ConversationStatus::Resolved);
        assert_eq!(c1.assigned_agent_id.as_deref(), Some("a1"));
        assert_eq!(c1.unread_count, 4);
        assert_eq!(st.conversation("c3").unwrap().unread_count, 2);
    }
}
