// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote messaging gateway trait (the social-messaging provider).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FlowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, Message, MessageId, Page};

/// Adapter for the remote messaging API.
///
/// Every call may fail with [`FlowError::Remote`]. Implementations turn the
/// provider's loosely-shaped payloads into validated domain records and drop
/// items they cannot parse.
#[async_trait]
pub trait RemoteGateway: PluginAdapter {
    /// Lists the pages the authenticated user manages.
    ///
    /// `user_token` is the result of the provider's login handshake.
    async fn list_pages(&self, user_token: &str) -> Result<Vec<Page>, FlowError>;

    /// Lists the conversations of one page.
    async fn list_conversations(
        &self,
        page_id: &str,
        credential: &str,
    ) -> Result<Vec<Conversation>, FlowError>;

    /// Lists the messages of one conversation, oldest first.
    ///
    /// `page_id` decides message direction: anything not sent by the page is
    /// incoming. `since` bounds the fetch to newer messages.
    async fn list_messages(
        &self,
        conversation_id: &str,
        page_id: &str,
        credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, FlowError>;

    /// Sends a text to a customer on behalf of a page.
    async fn send(
        &self,
        recipient_customer_id: &str,
        text: &str,
        credential: &str,
    ) -> Result<MessageId, FlowError>;

    /// Checks that `credential` still grants access to `page_id`.
    async fn verify_credential(&self, page_id: &str, credential: &str)
    -> Result<bool, FlowError>;
}
