// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic delta sync of open conversations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Inbox;

/// Spawns the per-conversation poll loop.
pub struct ConversationPoller;

impl ConversationPoller {
    /// Start polling `conversation_id`: one delta sync right away, then one
    /// per `interval`. Errors are logged and the loop keeps going.
    pub fn spawn(inbox: Arc<Inbox>, conversation_id: String, interval: Duration) -> PollHandle {
        Self::spawn_with_token(inbox, conversation_id, interval, CancellationToken::new())
    }

    /// Like [`ConversationPoller::spawn`], with the liveness token supplied
    /// by the caller (typically a child of the process shutdown token).
    pub fn spawn_with_token(
        inbox: Arc<Inbox>,
        conversation_id: String,
        interval: Duration,
        token: CancellationToken,
    ) -> PollHandle {
        let liveness = token.clone();
        let id = conversation_id.clone();

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = liveness.cancelled() => {
                        debug!(conversation_id = %id, "poller stopped");
                        return;
                    }
                    _ = timer.tick() => {
                        match inbox.sync_delta_while(&id, &liveness).await {
                            Ok(report) if report.inserted > 0 => {
                                debug!(
                                    conversation_id = %id,
                                    inserted = report.inserted,
                                    superseded = report.superseded,
                                    "poll picked up messages"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!(conversation_id = %id, error = %e, "poll failed (non-fatal)");
                            }
                        }
                    }
                }
            }
        });

        PollHandle {
            conversation_id,
            token,
            task,
        }
    }
}

/// Handle to a running poll loop.
pub struct PollHandle {
    conversation_id: String,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Stop the loop. A fetch already in flight finishes but its results are dropped.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!(conversation_id = %self.conversation_id, error = %e, "poller task panicked");
        }
    }
}

/// The set of running pollers, kept in line with the pollable conversations.
pub struct Pollers {
    inbox: Arc<Inbox>,
    interval: Duration,
    parent: CancellationToken,
    running: HashMap<String, PollHandle>,
}

impl Pollers {
    pub fn new(inbox: Arc<Inbox>, interval: Duration, parent: CancellationToken) -> Self {
        Self {
            inbox,
            interval,
            parent,
            running: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub fn is_polling(&self, conversation_id: &str) -> bool {
        self.running.contains_key(conversation_id)
    }

    /// Start pollers for new pollable conversations and stop the ones that
    /// are no longer pollable (resolved, page disconnected, removed).
    pub async fn reconcile(&mut self) {
        let wanted = self.inbox.pollable_conversations().await;

        let stale: Vec<String> = self
            .running
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handle) = self.running.remove(&id) {
                handle.cancel();
            }
        }

        let mut started = 0usize;
        for id in wanted {
            if self.running.contains_key(&id) {
                continue;
            }
            let handle = ConversationPoller::spawn_with_token(
                self.inbox.clone(),
                id.clone(),
                self.interval,
                self.parent.child_token(),
            );
            self.running.insert(id, handle);
            started += 1;
        }
        if started > 0 {
            info!(started, total = self.running.len(), "pollers started");
        }
    }

    /// Cancel every poller and wait for them to exit.
    pub async fn shutdown(&mut self) {
        let handles: Vec<PollHandle> = self.running.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.stop().await;
        }
    }
}
