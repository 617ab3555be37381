// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flows across the inbox, session gate and dashboard.
//!
//! Each test creates an isolated TestHarness with temp SQLite and a mock
//! provider. Tests are independent and order-insensitive.

use std::time::Duration;

use chrono::Utc;
use mflow_auth::{NewAgent, SessionGate};
use mflow_core::{ConversationStatus, MessageOrigin, Role};
use mflow_dashboard::project;
use mflow_sync::{InboxSettings, Pollers};
use mflow_test_utils::TestHarness;
use mflow_test_utils::fixtures::{conversation, incoming, page};
use tokio_util::sync::CancellationToken;

async fn connected(settings: InboxSettings) -> TestHarness {
    let h = TestHarness::builder().with_settings(settings).build().await.unwrap();
    h.gateway.add_page(page("p1", Some("tok"))).await;
    h.gateway.add_conversation(conversation("c1", "p1", "u1")).await;
    h.gateway
        .push_messages(vec![incoming("m1", "c1", "where is my parcel?", 0)])
        .await;

    let pages = h.inbox.connect_pages("user-token").await.unwrap();
    assert_eq!(pages.len(), 1);
    let report = h.inbox.sync_full("p1").await.unwrap();
    assert_eq!(report.ingest.inserted, 1);
    h
}

async fn logged_in_agent(h: &TestHarness) -> (SessionGate, mflow_core::Agent) {
    let gate = SessionGate::new(h.store.clone());
    let agent = gate
        .add_agent(NewAgent {
            name: "Ana".into(),
            email: "ana@shop.example".into(),
            secret: "hunter2".into(),
            role: Role::Agent,
            avatar: String::new(),
        })
        .await
        .unwrap();
    h.inbox.assign_agent_to_page("p1", &agent.id).await.unwrap();
    assert!(gate.login("ana@shop.example", "hunter2").await.unwrap());
    let agent = gate.current_agent().await.unwrap();
    (gate, agent)
}

fn outbound_bubbles(messages: &[mflow_core::Message]) -> Vec<&mflow_core::Message> {
    messages.iter().filter(|m| !m.is_incoming).collect()
}

#[tokio::test]
async fn delta_echo_replaces_optimistic_send() {
    let settings = InboxSettings {
        ingest_send_receipts: false,
        ..InboxSettings::default()
    };
    let h = connected(settings).await;
    let (gate, agent) = logged_in_agent(&h).await;
    let pages = h.inbox.pages().await;
    assert!(gate.can_view(&pages[0]).await);

    let sent = h
        .inbox
        .send_outbound("c1", "It ships tomorrow.", &agent)
        .await
        .unwrap();
    assert_eq!(sent.origin, MessageOrigin::Optimistic);
    assert_eq!(outbound_bubbles(&h.inbox.messages_for("c1").await).len(), 1);

    let report = h.inbox.sync_delta("c1").await.unwrap();
    assert_eq!(report.superseded, 1);

    let thread = h.inbox.messages_for("c1").await;
    let outbound = outbound_bubbles(&thread);
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].id, "m_mock_1");
    assert_eq!(outbound[0].origin, MessageOrigin::Authoritative);
    assert_eq!(h.gateway.sent().await.len(), 1);

    // A second tick sees the same echo and changes nothing.
    let again = h.inbox.sync_delta("c1").await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(outbound_bubbles(&h.inbox.messages_for("c1").await).len(), 1);

    let reopened = h.reopen().await.unwrap();
    let persisted = reopened.messages_for("c1").await;
    let persisted_out = outbound_bubbles(&persisted);
    assert_eq!(persisted_out.len(), 1);
    assert_eq!(persisted_out[0].id, "m_mock_1");
}

#[tokio::test]
async fn receipt_then_echo_still_yields_one_bubble() {
    let h = connected(InboxSettings::default()).await;
    let (_gate, agent) = logged_in_agent(&h).await;

    let sent = h
        .inbox
        .send_outbound("c1", "It ships tomorrow.", &agent)
        .await
        .unwrap();
    assert_eq!(sent.id, "m_mock_1");

    let report = h.inbox.sync_delta("c1").await.unwrap();
    assert_eq!(report.inserted, 0);

    let thread = h.inbox.messages_for("c1").await;
    let outbound = outbound_bubbles(&thread);
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].id, "m_mock_1");
    assert_eq!(
        h.inbox.conversation("c1").await.unwrap().last_message,
        "It ships tomorrow."
    );
}

#[tokio::test]
async fn dashboard_reflects_the_agents_pages() {
    let h = connected(InboxSettings::default()).await;
    let (_gate, agent) = logged_in_agent(&h).await;
    h.inbox.simulate_inbound("p1").await.unwrap();

    let stats = project(&h.inbox.snapshot().await, &agent, Utc::now());
    assert_eq!(stats.open_chats, 2);
    assert_eq!(stats.chart.len(), 7);

    let c1 = h.inbox.conversation("c1").await.unwrap();
    h.inbox
        .set_status(&c1.id, ConversationStatus::Resolved)
        .await
        .unwrap();
    let stats = project(&h.inbox.snapshot().await, &agent, Utc::now());
    assert_eq!(stats.open_chats, 1);
    assert_eq!(stats.resolved_today, 1);

    h.inbox.unassign_agent_from_page("p1", &agent.id).await.unwrap();
    let stats = project(&h.inbox.snapshot().await, &agent, Utc::now());
    assert_eq!(stats.open_chats, 0);
}

#[tokio::test]
async fn pollers_follow_open_conversations() {
    let h = connected(InboxSettings::default()).await;
    let cancel = CancellationToken::new();
    let mut pollers = Pollers::new(h.inbox.clone(), Duration::from_millis(20), cancel.clone());

    pollers.reconcile().await;
    assert!(pollers.is_polling("c1"));

    h.gateway
        .push_messages(vec![incoming("m2", "c1", "hello again", 5)])
        .await;
    let inbox = h.inbox.clone();
    tokio::time::timeout(Duration::from_secs(5), async move {
        while inbox.messages_for("c1").await.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("poller should pick up the new message");

    h.inbox
        .set_status("c1", ConversationStatus::Resolved)
        .await
        .unwrap();
    pollers.reconcile().await;
    assert!(!pollers.is_polling("c1"));
    assert!(pollers.is_empty());

    cancel.cancel();
    pollers.shutdown().await;
}
