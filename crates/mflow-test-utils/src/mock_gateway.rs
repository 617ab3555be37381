// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`RemoteGateway`] for deterministic tests.
//!
//! `MockGateway` plays the provider side: tests seed pages, conversations and
//! messages, and sends can be echoed back into the conversation the way the
//! real provider reports page-sent messages on the next fetch.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use mflow_core::{
    AdapterType, Conversation, FlowError, HealthStatus, Message, MessageId, MessageOrigin, Page,
    PluginAdapter, RemoteGateway,
};

/// One call to [`RemoteGateway::send`] as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub id: String,
    pub recipient: String,
    pub text: String,
    pub credential: String,
}

#[derive(Default)]
struct Remote {
    pages: Vec<Page>,
    conversations: HashMap<String, Vec<Conversation>>,
    messages: HashMap<String, Vec<Message>>,
    sent: Vec<SentMessage>,
    fetches: Vec<(String, Option<DateTime<Utc>>)>,
    send_error: Option<String>,
    failing: HashSet<String>,
    revoked: HashSet<String>,
    echo_sends: bool,
    next_id: u64,
}

/// In-process stand-in for the messaging provider.
pub struct MockGateway {
    remote: Mutex<Remote>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            remote: Mutex::new(Remote {
                echo_sends: true,
                ..Remote::default()
            }),
            fetch_delay: Mutex::new(None),
        }
    }

    /// Pages returned by `list_pages`.
    pub async fn add_page(&self, page: Page) {
        self.remote.lock().await.pages.push(page);
    }

    pub async fn add_conversation(&self, conversation: Conversation) {
        self.remote
            .lock()
            .await
            .conversations
            .entry(conversation.page_id.clone())
            .or_default()
            .push(conversation);
    }

    /// Append messages to the remote history of their conversation.
    pub async fn push_messages(&self, messages: Vec<Message>) {
        let mut remote = self.remote.lock().await;
        for msg in messages {
            remote
                .messages
                .entry(msg.conversation_id.clone())
                .or_default()
                .push(msg);
        }
    }

    /// Whether successful sends show up in later fetches. On by default.
    pub async fn set_echo_sends(&self, echo: bool) {
        self.remote.lock().await.echo_sends = echo;
    }

    /// Make every following send fail with `message`; `None` restores success.
    pub async fn fail_sends(&self, message: Option<&str>) {
        self.remote.lock().await.send_error = message.map(str::to_string);
    }

    /// Make message fetches of one conversation fail.
    pub async fn fail_fetches_for(&self, conversation_id: &str) {
        self.remote
            .lock()
            .await
            .failing
            .insert(conversation_id.to_string());
    }

    /// Make `verify_credential` reject this credential.
    pub async fn revoke(&self, credential: &str) {
        self.remote.lock().await.revoked.insert(credential.to_string());
    }

    /// Delay every `list_messages` call by `delay`.
    pub async fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.lock().await = delay;
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.remote.lock().await.sent.clone()
    }

    /// `(conversation_id, since)` of every `list_messages` call, in order.
    pub async fn fetches(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.remote.lock().await.fetches.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Remote
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn list_pages(&self, _user_token: &str) -> Result<Vec<Page>, FlowError> {
        Ok(self.remote.lock().await.pages.clone())
    }

    async fn list_conversations(
        &self,
        page_id: &str,
        _credential: &str,
    ) -> Result<Vec<Conversation>, FlowError> {
        Ok(self
            .remote
            .lock()
            .await
            .conversations
            .get(page_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        _page_id: &str,
        _credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, FlowError> {
        {
            let mut remote = self.remote.lock().await;
            remote.fetches.push((conversation_id.to_string(), since));
            if remote.failing.contains(conversation_id) {
                return Err(FlowError::remote("(#100) Unsupported get request."));
            }
        }

        let delay = *self.fetch_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remote = self.remote.lock().await;
        let mut out: Vec<Message> = remote
            .messages
            .get(conversation_id)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| since.is_none_or(|s| m.timestamp >= s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    async fn send(
        &self,
        recipient_customer_id: &str,
        text: &str,
        credential: &str,
    ) -> Result<MessageId, FlowError> {
        let mut remote = self.remote.lock().await;
        if let Some(message) = remote.send_error.clone() {
            return Err(FlowError::remote(message));
        }

        remote.next_id += 1;
        let id = format!("m_mock_{}", remote.next_id);
        remote.sent.push(SentMessage {
            id: id.clone(),
            recipient: recipient_customer_id.to_string(),
            text: text.to_string(),
            credential: credential.to_string(),
        });

        if remote.echo_sends {
            let target = remote
                .conversations
                .values()
                .flatten()
                .find(|c| c.customer_id == recipient_customer_id)
                .map(|c| (c.id.clone(), c.page_id.clone()));
            if let Some((conversation_id, page_id)) = target {
                let echo = Message {
                    id: id.clone(),
                    conversation_id: conversation_id.clone(),
                    sender_id: page_id.clone(),
                    sender_name: page_id,
                    text: text.to_string(),
                    timestamp: Utc::now(),
                    is_incoming: false,
                    is_read: true,
                    origin: MessageOrigin::Authoritative,
                    delivery_error: None,
                };
                remote.messages.entry(conversation_id).or_default().push(echo);
            }
        }

        Ok(MessageId(id))
    }

    async fn verify_credential(
        &self,
        _page_id: &str,
        credential: &str,
    ) -> Result<bool, FlowError> {
        Ok(!self.remote.lock().await.revoked.contains(credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, conversation, incoming, page};

    #[tokio::test]
    async fn since_filters_history() {
        let gw = MockGateway::new();
        gw.push_messages(vec![incoming("m1", "c1", "old", 0), incoming("m2", "c1", "new", 60)])
            .await;
        let msgs = gw.list_messages("c1", "p1", "tok", Some(at(30))).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, "m2");
        assert_eq!(gw.fetches().await, vec![("c1".to_string(), Some(at(30)))]);
    }

    #[tokio::test]
    async fn send_echoes_into_conversation() {
        let gw = MockGateway::new();
        gw.add_page(page("p1", Some("tok"))).await;
        gw.add_conversation(conversation("c1", "p1", "u1")).await;

        let id = gw.send("u1", "hello", "tok").await.unwrap();
        let msgs = gw.list_messages("c1", "p1", "tok", None).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, id.0);
        assert!(!msgs[0].is_incoming);
    }

    #[tokio::test]
    async fn failed_send_is_remote_error() {
        let gw = MockGateway::new();
        gw.fail_sends(Some("(#551) This person isn't available right now.")).await;
        let err = gw.send("u1", "hi", "tok").await.unwrap_err();
        assert!(err.is_transient());
        assert!(gw.sent().await.is_empty());
    }
}
