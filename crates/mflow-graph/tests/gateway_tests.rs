// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GraphGateway against a mocked Graph API.

use chrono::{TimeZone, Utc};
use mflow_config::model::GraphConfig;
use mflow_core::{FlowError, RemoteGateway};
use mflow_graph::GraphGateway;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> GraphGateway {
    GraphGateway::new(&GraphConfig {
        api_base: server.uri(),
        api_version: "v22.0".into(),
        user_access_token: None,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn list_pages_maps_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v22.0/me/accounts"))
        .and(query_param("access_token", "user-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p1", "name": "Shoe Shop", "category": "Retail", "access_token": "page-tok-1"},
                {"name": "no id, dropped"},
                {"id": "p2", "name": "Cafe", "access_token": "page-tok-2"}
            ]
        })))
        .mount(&server)
        .await;

    let pages = gateway(&server).list_pages("user-tok").await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].id, "p1");
    assert_eq!(pages[0].category, "Retail");
    assert_eq!(pages[1].category, "Business");
    assert_eq!(pages[1].access_token.as_deref(), Some("page-tok-2"));
    assert!(pages.iter().all(|p| p.assigned_agent_ids.is_empty()));
}

#[tokio::test]
async fn list_conversations_follows_paging() {
    let server = MockServer::start().await;
    let next = format!(
        "{}/v22.0/p1/conversations?access_token=tok&after=CURSOR",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/v22.0/p1/conversations"))
        .and(query_param("after", "CURSOR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "t_2",
                "updated_time": "2026-03-02T08:00:00+0000",
                "participants": {"data": [{"id": "u2", "name": "Bo"}, {"id": "p1", "name": "Shop"}]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v22.0/p1/conversations"))
        .and(query_param("platform", "messenger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "t_1",
                "updated_time": "2026-03-01T12:00:00+0000",
                "snippet": "where is my order?",
                "unread_count": 2,
                "participants": {"data": [{"id": "p1", "name": "Shop"}, {"id": "u1", "name": "Ana"}]}
            }],
            "paging": {"next": next}
        })))
        .mount(&server)
        .await;

    let convs = gateway(&server).list_conversations("p1", "tok").await.unwrap();
    let ids: Vec<_> = convs.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["t_1", "t_2"]);
    assert_eq!(convs[0].customer_id, "u1");
    assert_eq!(convs[0].unread_count, 2);
    assert_eq!(convs[1].customer_name, "Bo");
    assert!(convs.iter().all(|c| c.page_id == "p1"));
}

#[tokio::test]
async fn list_messages_is_oldest_first_with_direction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v22.0/t_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "m3", "message": "on its way", "from": {"id": "p1", "name": "Shop"}, "created_time": "2026-03-01T12:02:00+0000"},
                {"id": "m2", "message": "order 42", "from": {"id": "u1", "name": "Ana"}, "created_time": "2026-03-01T12:01:00+0000"},
                {"id": "m1", "message": "hi", "from": {"id": "u1", "name": "Ana"}, "created_time": "2026-03-01T12:00:00+0000"},
                {"id": "broken", "message": "no time", "from": {"id": "u1"}}
            ]
        })))
        .mount(&server)
        .await;

    let msgs = gateway(&server)
        .list_messages("t_1", "p1", "tok", None)
        .await
        .unwrap();
    let ids: Vec<_> = msgs.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert!(msgs[0].is_incoming);
    assert!(!msgs[2].is_incoming);
    assert!(msgs.iter().all(|m| m.conversation_id == "t_1"));
}

#[tokio::test]
async fn list_messages_bounds_by_since() {
    let server = MockServer::start().await;
    let since = Utc.with_ymd_and_hms(2026, 3, 1, 12, 1, 0).unwrap();
    Mock::given(method("GET"))
        .and(path("/v22.0/t_1/messages"))
        .and(query_param("since", since.timestamp().to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "m2", "message": "new", "from": {"id": "u1"}, "created_time": "2026-03-01T12:01:30+0000"},
                {"id": "m1", "message": "old", "from": {"id": "u1"}, "created_time": "2026-03-01T12:00:00+0000"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let msgs = gateway(&server)
        .list_messages("t_1", "p1", "tok", Some(since))
        .await
        .unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].id, "m2");
}

#[tokio::test]
async fn send_posts_response_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v22.0/me/messages"))
        .and(query_param("access_token", "page-tok"))
        .and(body_json(json!({
            "recipient": {"id": "u1"},
            "message": {"text": "thanks!"},
            "messaging_type": "RESPONSE"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"recipient_id": "u1", "message_id": "m_abc"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = gateway(&server).send("u1", "thanks!", "page-tok").await.unwrap();
    assert_eq!(id.0, "m_abc");
}

#[tokio::test]
async fn send_error_carries_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v22.0/me/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "(#10) This message is sent outside of allowed window.", "type": "OAuthException", "code": 10}
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).send("u1", "late", "tok").await.unwrap_err();
    match err {
        FlowError::Remote { message, .. } => {
            assert_eq!(message, "(#10) This message is sent outside of allowed window.")
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_credential_distinguishes_revoked_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v22.0/p1"))
        .and(query_param("access_token", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v22.0/p1"))
        .and(query_param("access_token", "revoked"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Error validating access token", "type": "OAuthException", "code": 190}
        })))
        .mount(&server)
        .await;

    let gw = gateway(&server);
    assert!(gw.verify_credential("p1", "good").await.unwrap());
    assert!(!gw.verify_credential("p1", "revoked").await.unwrap());
}
