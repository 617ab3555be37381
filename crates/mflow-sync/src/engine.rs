// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`Inbox`]: sole owner and mutator of canonical inbox state.
//!
//! Every mutation goes through [`Inbox::commit`], which holds the write mutex
//! across both the in-memory change and the store writes that mirror it, so
//! the durable write order always matches the in-memory order.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mflow_config::model::MflowConfig;
use mflow_config::validation::MAX_DELTA_LOOKBACK_SECS;
use mflow_core::record::load_all;
use mflow_core::{
    Agent, ApprovedLink, ApprovedMedia, Conversation, ConversationStatus, FlowError,
    HealthStatus, InboxSnapshot, Message, MessageOrigin, Page, RemoteGateway, StoreAdapter,
    SyncMarker,
};
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::policy::ContentPolicy;
use crate::reconcile::{InboxState, IngestReport, WriteOp, WritePlan};

/// Engine knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct InboxSettings {
    /// How far back a delta fetch reaches.
    pub delta_lookback: Duration,
    /// Ingest the id returned by a successful send as the authoritative record.
    pub ingest_send_receipts: bool,
    /// Let super admins skip the content policy.
    pub admin_bypass: bool,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            delta_lookback: Duration::seconds(300),
            ingest_send_receipts: true,
            admin_bypass: false,
        }
    }
}

impl InboxSettings {
    pub fn from_config(config: &MflowConfig) -> Self {
        Self {
            delta_lookback: lookback_from_secs(config.sync.delta_lookback_secs),
            ingest_send_receipts: config.sync.ingest_send_receipts,
            admin_bypass: config.policy.admin_bypass,
        }
    }
}

/// Lookback of `secs`, clamped to the largest window configuration allows.
fn lookback_from_secs(secs: u64) -> Duration {
    let secs = secs.min(MAX_DELTA_LOOKBACK_SECS);
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| InboxSettings::default().delta_lookback)
}

/// Counters of a full history sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub conversations: usize,
    /// Conversations (or whole pages for [`Inbox::sync_all`]) that failed.
    pub failed: usize,
    pub ingest: IngestReport,
}

/// Canonical inbox state plus the adapters it is mirrored to and fetched from.
pub struct Inbox {
    store: Arc<dyn StoreAdapter>,
    remote: Arc<dyn RemoteGateway>,
    settings: InboxSettings,
    state: RwLock<InboxState>,
    write_lock: Mutex<()>,
    degraded: Mutex<Option<String>>,
}

impl Inbox {
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        remote: Arc<dyn RemoteGateway>,
        settings: InboxSettings,
    ) -> Self {
        Self {
            store,
            remote,
            settings,
            state: RwLock::new(InboxState::default()),
            write_lock: Mutex::new(()),
            degraded: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &InboxSettings {
        &self.settings
    }

    /// Open the store and replace canonical state with its contents.
    pub async fn load(&self) -> Result<(), FlowError> {
        let _guard = self.write_lock.lock().await;
        self.store.init().await?;

        let store = self.store.as_ref();
        let state = InboxState::new(
            load_all::<Page>(store).await?,
            load_all::<Conversation>(store).await?,
            load_all::<Message>(store).await?,
            load_all::<ApprovedLink>(store).await?,
            load_all::<ApprovedMedia>(store).await?,
            load_all::<SyncMarker>(store).await?,
        );
        info!(
            pages = state.pages.len(),
            conversations = state.conversations.len(),
            messages = state.messages.len(),
            "inbox loaded"
        );
        *self.state.write().await = state;
        *self.degraded.lock().await = None;
        Ok(())
    }

    /// Apply `mutate` to canonical state, then persist the plan it returns.
    async fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut InboxState) -> Result<(WritePlan, R), FlowError>,
    ) -> Result<R, FlowError> {
        let _guard = self.write_lock.lock().await;
        let (plan, out) = {
            let mut state = self.state.write().await;
            mutate(&mut state)?
        };
        self.persist(plan).await?;
        Ok(out)
    }

    async fn persist(&self, plan: WritePlan) -> Result<(), FlowError> {
        for op in plan.into_ops() {
            let result = match op {
                WriteOp::Put(table, record) => self.store.put(table, record).await,
                WriteOp::Delete(table, id) => self.store.delete(table, &id).await,
                WriteOp::Clear(table) => self.store.clear_store(table).await,
            };
            if let Err(e) = result {
                error!(error = %e, "store write failed, memory and store may diverge");
                *self.degraded.lock().await = Some(e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }

    /// Merge a batch of messages into canonical state.
    ///
    /// `is_delta` marks live traffic; only then do new incoming unread
    /// messages bump the unread counter.
    pub async fn ingest(
        &self,
        messages: Vec<Message>,
        is_delta: bool,
    ) -> Result<IngestReport, FlowError> {
        if messages.is_empty() {
            return Ok(IngestReport::default());
        }
        let report = self
            .commit(|state| state.apply_batch(messages, is_delta))
            .await?;
        debug!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            superseded = report.superseded,
            orphaned = report.orphaned,
            is_delta,
            "ingest applied"
        );
        Ok(report)
    }

    /// Send `text` to the customer of `conversation_id` on behalf of `sender`.
    ///
    /// Returns the record that now represents the send: the authoritative
    /// message when a receipt was ingested, the optimistic one otherwise.
    pub async fn send_outbound(
        &self,
        conversation_id: &str,
        text: &str,
        sender: &Agent,
    ) -> Result<Message, FlowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FlowError::InvalidInput("message text is empty".into()));
        }

        let (conversation, page) = {
            let state = self.state.read().await;
            let conversation = state
                .conversation(conversation_id)
                .cloned()
                .ok_or_else(|| FlowError::not_found("conversation", conversation_id))?;
            let page = state
                .page(&conversation.page_id)
                .cloned()
                .ok_or_else(|| FlowError::not_found("page", &conversation.page_id))?;
            if !(sender.is_admin() && self.settings.admin_bypass) {
                ContentPolicy::new(&state.links, &state.media).check(text)?;
            }
            (conversation, page)
        };

        let optimistic = Message {
            id: format!("local-{}", Uuid::new_v4()),
            conversation_id: conversation.id.clone(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
            is_incoming: false,
            is_read: true,
            origin: MessageOrigin::Optimistic,
            delivery_error: None,
        };
        self.ingest(vec![optimistic.clone()], true).await?;

        let Some(token) = page.access_token.as_deref() else {
            debug!(page_id = %page.id, "page has no access token, keeping message local");
            return Ok(optimistic);
        };

        match self.remote.send(&conversation.customer_id, text, token).await {
            Ok(id) => {
                info!(conversation_id, message_id = %id.0, "message sent");
                if !self.settings.ingest_send_receipts {
                    return Ok(optimistic);
                }
                let confirmed = Message {
                    id: id.0,
                    sender_id: page.id.clone(),
                    sender_name: page.name.clone(),
                    timestamp: Utc::now(),
                    origin: MessageOrigin::Authoritative,
                    ..optimistic
                };
                self.ingest(vec![confirmed.clone()], true).await?;
                Ok(confirmed)
            }
            Err(e) => {
                let reason = match &e {
                    FlowError::Remote { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                warn!(conversation_id, error = %reason, "send failed");
                let id = optimistic.id.clone();
                self.commit(|state| {
                    let mut plan = WritePlan::default();
                    if let Some(msg) = state.messages.iter_mut().find(|m| m.id == id) {
                        msg.delivery_error = Some(reason);
                        plan.put(&*msg)?;
                    }
                    Ok((plan, ()))
                })
                .await?;
                Err(e)
            }
        }
    }

    /// Fetch recent messages of one conversation and ingest them as live traffic.
    pub async fn sync_delta(&self, conversation_id: &str) -> Result<IngestReport, FlowError> {
        self.sync_delta_while(conversation_id, &CancellationToken::new())
            .await
    }

    /// Like [`Inbox::sync_delta`], but results fetched after `liveness` was
    /// cancelled are discarded.
    pub async fn sync_delta_while(
        &self,
        conversation_id: &str,
        liveness: &CancellationToken,
    ) -> Result<IngestReport, FlowError> {
        let (page_id, token, since) = {
            let state = self.state.read().await;
            let conversation = state
                .conversation(conversation_id)
                .ok_or_else(|| FlowError::not_found("conversation", conversation_id))?;
            let page = state
                .page(&conversation.page_id)
                .ok_or_else(|| FlowError::not_found("page", &conversation.page_id))?;
            let Some(token) = page.access_token.clone() else {
                return Ok(IngestReport::default());
            };
            // A window that underflows the calendar means "no lower bound".
            let lookback = self.settings.delta_lookback;
            let since = if state.history_synced(&page.id) {
                state
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == conversation_id && !m.is_optimistic())
                    .map(|m| m.timestamp)
                    .max()
                    .and_then(|latest| latest.checked_sub_signed(lookback))
            } else {
                Utc::now().checked_sub_signed(lookback)
            };
            (page.id.clone(), token, since)
        };

        let messages = self
            .remote
            .list_messages(conversation_id, &page_id, &token, since)
            .await?;

        if messages.is_empty() {
            return Ok(IngestReport::default());
        }
        let fetched = messages.len();
        // Checked under the write lock so a cancel that lands while waiting
        // for another commit still discards the batch.
        let applied = self
            .commit(|state| {
                if liveness.is_cancelled() {
                    return Ok((WritePlan::default(), None));
                }
                let (plan, report) = state.apply_batch(messages, true)?;
                Ok((plan, Some(report)))
            })
            .await?;

        match applied {
            Some(report) => {
                debug!(
                    conversation_id,
                    inserted = report.inserted,
                    superseded = report.superseded,
                    "delta applied"
                );
                Ok(report)
            }
            None => {
                debug!(conversation_id, fetched, "poll cancelled, discarding results");
                Ok(IngestReport::default())
            }
        }
    }

    /// Full history sync of one page.
    pub async fn sync_full(&self, page_id: &str) -> Result<SyncReport, FlowError> {
        let token = {
            let state = self.state.read().await;
            let page = state
                .page(page_id)
                .ok_or_else(|| FlowError::not_found("page", page_id))?;
            page.access_token.clone().ok_or_else(|| {
                FlowError::InvalidInput(format!("page {page_id} has no access token"))
            })?
        };

        let remote = self.remote.list_conversations(page_id, &token).await?;
        let ids: Vec<String> = remote.iter().map(|c| c.id.clone()).collect();
        self.commit(|state| Ok((state.merge_conversations(remote)?, ())))
            .await?;

        let mut report = SyncReport {
            pages: 1,
            conversations: ids.len(),
            ..SyncReport::default()
        };
        for id in &ids {
            let fetched = self.remote.list_messages(id, page_id, &token, None).await;
            match fetched {
                Ok(messages) => report.ingest.absorb(self.ingest(messages, false).await?),
                Err(e) => {
                    warn!(page_id, conversation_id = %id, error = %e, "history fetch failed, skipping");
                    report.failed += 1;
                }
            }
        }

        let synced_at = Utc::now();
        self.commit(|state| {
            let mut plan = state.rederive_summaries(page_id)?;
            let marker = SyncMarker {
                id: page_id.to_string(),
                history_synced: true,
                last_full_sync: Some(synced_at),
            };
            plan.put(&marker)?;
            state.markers.insert(marker.id.clone(), marker);
            Ok((plan, ()))
        })
        .await?;

        info!(
            page_id,
            conversations = report.conversations,
            inserted = report.ingest.inserted,
            failed = report.failed,
            "full sync finished"
        );
        Ok(report)
    }

    /// Full history sync of every connected page that has a token.
    pub async fn sync_all(&self) -> SyncReport {
        let page_ids: Vec<String> = {
            let state = self.state.read().await;
            state
                .pages
                .iter()
                .filter(|p| p.is_connected && p.access_token.is_some())
                .map(|p| p.id.clone())
                .collect()
        };

        let mut total = SyncReport::default();
        for page_id in page_ids {
            match self.sync_full(&page_id).await {
                Ok(r) => {
                    total.pages += 1;
                    total.conversations += r.conversations;
                    total.failed += r.failed;
                    total.ingest.absorb(r.ingest);
                }
                Err(e) => {
                    warn!(page_id = %page_id, error = %e, "page sync failed");
                    total.failed += 1;
                }
            }
        }
        total
    }

    /// Import the pages behind a user token, keeping local agent assignments.
    pub async fn connect_pages(&self, user_token: &str) -> Result<Vec<Page>, FlowError> {
        let remote = self.remote.list_pages(user_token).await?;
        let connected = self
            .commit(|state| {
                let mut plan = WritePlan::default();
                let mut out = Vec::with_capacity(remote.len());
                for incoming in remote {
                    let page = match state.page_mut(&incoming.id) {
                        Some(existing) => {
                            existing.name = incoming.name;
                            existing.category = incoming.category;
                            existing.access_token = incoming.access_token;
                            existing.is_connected = true;
                            existing.clone()
                        }
                        None => {
                            let page = Page {
                                is_connected: true,
                                ..incoming
                            };
                            state.pages.push(page.clone());
                            page
                        }
                    };
                    plan.put(&page)?;
                    out.push(page);
                }
                Ok((plan, out))
            })
            .await?;
        info!(count = connected.len(), "pages connected");
        Ok(connected)
    }

    /// Insert or replace a page.
    pub async fn add_page(&self, page: Page) -> Result<(), FlowError> {
        self.commit(|state| {
            let mut plan = WritePlan::default();
            plan.put(&page)?;
            match state.page_mut(&page.id) {
                Some(existing) => *existing = page,
                None => state.pages.push(page),
            }
            Ok((plan, ()))
        })
        .await
    }

    /// Remove a page. Its conversations and messages stay.
    pub async fn remove_page(&self, page_id: &str) -> Result<(), FlowError> {
        self.commit(|state| {
            let before = state.pages.len();
            state.pages.retain(|p| p.id != page_id);
            if state.pages.len() == before {
                return Err(FlowError::not_found("page", page_id));
            }
            let mut plan = WritePlan::default();
            plan.delete::<Page>(page_id);
            Ok((plan, ()))
        })
        .await
    }

    /// Re-check a page's token and record whether it is still connected.
    pub async fn verify_page(&self, page_id: &str) -> Result<bool, FlowError> {
        let (token, connected) = {
            let state = self.state.read().await;
            let page = state
                .page(page_id)
                .ok_or_else(|| FlowError::not_found("page", page_id))?;
            (page.access_token.clone(), page.is_connected)
        };
        let Some(token) = token else {
            return Ok(connected);
        };

        let valid = self.remote.verify_credential(page_id, &token).await?;
        if valid != connected {
            self.update_page(page_id, |p| p.is_connected = valid).await?;
            info!(page_id, connected = valid, "page connection changed");
        }
        Ok(valid)
    }

    pub async fn assign_agent_to_page(&self, page_id: &str, agent_id: &str) -> Result<(), FlowError> {
        self.update_page(page_id, |p| {
            if !p.assigned_agent_ids.iter().any(|id| id == agent_id) {
                p.assigned_agent_ids.push(agent_id.to_string());
            }
        })
        .await
    }

    pub async fn unassign_agent_from_page(
        &self,
        page_id: &str,
        agent_id: &str,
    ) -> Result<(), FlowError> {
        self.update_page(page_id, |p| p.assigned_agent_ids.retain(|id| id != agent_id))
            .await
    }

    async fn update_page(&self, page_id: &str, f: impl FnOnce(&mut Page)) -> Result<(), FlowError> {
        self.commit(|state| {
            let page = state
                .page_mut(page_id)
                .ok_or_else(|| FlowError::not_found("page", page_id))?;
            f(page);
            let mut plan = WritePlan::default();
            plan.put(&*page)?;
            Ok((plan, ()))
        })
        .await
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&mut Conversation),
    ) -> Result<(), FlowError> {
        self.commit(|state| {
            let conversation = state
                .conversation_mut(conversation_id)
                .ok_or_else(|| FlowError::not_found("conversation", conversation_id))?;
            f(conversation);
            let mut plan = WritePlan::default();
            plan.put(&*conversation)?;
            Ok((plan, ()))
        })
        .await
    }

    pub async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), FlowError> {
        self.update_conversation(conversation_id, |c| c.status = status)
            .await
    }

    pub async fn assign_conversation(
        &self,
        conversation_id: &str,
        agent_id: Option<String>,
    ) -> Result<(), FlowError> {
        self.update_conversation(conversation_id, |c| c.assigned_agent_id = agent_id)
            .await
    }

    pub async fn attach_avatar_blob(
        &self,
        conversation_id: &str,
        blob: Vec<u8>,
    ) -> Result<(), FlowError> {
        self.update_conversation(conversation_id, |c| c.customer_avatar_blob = Some(blob))
            .await
    }

    /// Zero the unread counter and mark every incoming message read.
    pub async fn mark_read(&self, conversation_id: &str) -> Result<(), FlowError> {
        self.commit(|state| {
            let mut plan = WritePlan::default();
            for msg in state
                .messages
                .iter_mut()
                .filter(|m| m.conversation_id == conversation_id && m.is_incoming && !m.is_read)
            {
                msg.is_read = true;
                plan.put(&*msg)?;
            }
            let conversation = state
                .conversation_mut(conversation_id)
                .ok_or_else(|| FlowError::not_found("conversation", conversation_id))?;
            conversation.unread_count = 0;
            plan.put(&*conversation)?;
            Ok((plan, ()))
        })
        .await
    }

    /// Create a fake customer thread with one unread incoming message.
    pub async fn simulate_inbound(&self, page_id: &str) -> Result<Conversation, FlowError> {
        let number: u32 = rand::thread_rng().gen_range(100..1000);
        let now = Utc::now();
        let conversation = Conversation {
            id: format!("sim-{}", Uuid::new_v4()),
            page_id: page_id.to_string(),
            customer_id: format!("cust-{number}"),
            customer_name: format!("Meta Customer {number}"),
            customer_avatar: format!("https://picsum.photos/seed/{number}/200"),
            customer_avatar_blob: None,
            last_message: String::new(),
            last_timestamp: now,
            status: ConversationStatus::Open,
            assigned_agent_id: None,
            unread_count: 0,
        };

        self.commit(|state| {
            if state.page(page_id).is_none() {
                return Err(FlowError::not_found("page", page_id));
            }
            let mut plan = WritePlan::default();
            plan.put(&conversation)?;
            state.conversations.push(conversation.clone());
            Ok((plan, ()))
        })
        .await?;

        let greeting = Message {
            id: format!("sim-msg-{}", Uuid::new_v4()),
            conversation_id: conversation.id.clone(),
            sender_id: conversation.customer_id.clone(),
            sender_name: conversation.customer_name.clone(),
            text: "Hi, I have a question about my recent order.".into(),
            timestamp: now,
            is_incoming: true,
            is_read: false,
            origin: MessageOrigin::Authoritative,
            delivery_error: None,
        };
        self.ingest(vec![greeting], true).await?;

        let state = self.state.read().await;
        state
            .conversation(&conversation.id)
            .cloned()
            .ok_or_else(|| FlowError::Internal("simulated conversation vanished".into()))
    }

    pub async fn set_approved_links(&self, links: Vec<ApprovedLink>) -> Result<(), FlowError> {
        self.commit(|state| {
            let mut plan = WritePlan::default();
            plan.clear(mflow_core::Table::Links);
            for link in &links {
                plan.put(link)?;
            }
            state.links = links;
            Ok((plan, ()))
        })
        .await
    }

    pub async fn set_approved_media(&self, media: Vec<ApprovedMedia>) -> Result<(), FlowError> {
        self.commit(|state| {
            let mut plan = WritePlan::default();
            plan.clear(mflow_core::Table::Media);
            for item in &media {
                plan.put(item)?;
            }
            state.media = media;
            Ok((plan, ()))
        })
        .await
    }

    /// Drop every conversation, message and sync marker.
    pub async fn clear_all(&self) -> Result<(), FlowError> {
        self.commit(|state| {
            state.clear_threads();
            let mut plan = WritePlan::default();
            plan.clear(mflow_core::Table::Messages);
            plan.clear(mflow_core::Table::Conversations);
            plan.clear(mflow_core::Table::SyncState);
            Ok((plan, ()))
        })
        .await?;
        info!("conversations and messages cleared");
        Ok(())
    }

    pub async fn find_conversation(&self, page_id: &str, customer_id: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state
            .conversations
            .iter()
            .find(|c| c.page_id == page_id && c.customer_id == customer_id)
            .cloned()
    }

    pub async fn snapshot(&self) -> InboxSnapshot {
        self.state.read().await.snapshot()
    }

    /// Messages of one conversation sorted by timestamp.
    pub async fn messages_for(&self, conversation_id: &str) -> Vec<Message> {
        self.state.read().await.thread(conversation_id)
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.state.read().await.conversation(conversation_id).cloned()
    }

    pub async fn pages(&self) -> Vec<Page> {
        self.state.read().await.pages.clone()
    }

    pub async fn links(&self) -> Vec<ApprovedLink> {
        self.state.read().await.links.clone()
    }

    pub async fn media(&self) -> Vec<ApprovedMedia> {
        self.state.read().await.media.clone()
    }

    pub async fn last_full_sync(&self, page_id: &str) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .markers
            .get(page_id)
            .and_then(|m| m.last_full_sync)
    }

    /// Ids of OPEN conversations on connected pages that can be polled.
    pub async fn pollable_conversations(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .conversations
            .iter()
            .filter(|c| c.status == ConversationStatus::Open)
            .filter(|c| {
                state
                    .page(&c.page_id)
                    .is_some_and(|p| p.is_connected && p.access_token.is_some())
            })
            .map(|c| c.id.clone())
            .collect()
    }

    pub async fn health(&self) -> HealthStatus {
        match self.degraded.lock().await.as_ref() {
            Some(reason) => HealthStatus::Degraded(reason.clone()),
            None => HealthStatus::Healthy,
        }
    }
}
