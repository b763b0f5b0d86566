#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Gateway integration tests over a real listener, all providers on demo data.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    chatnest_config::ChatnestConfig,
    chatnest_gateway::{AppState, build_gateway_app},
    chatnest_inbox::InboxService,
    futures::StreamExt,
    serde_json::{Value, json},
    tokio::net::TcpListener,
    tokio_tungstenite::connect_async,
};

async fn start_server() -> SocketAddr {
    let inbox = Arc::new(InboxService::from_config(&ChatnestConfig::default()));
    let app = build_gateway_app(AppState::new(inbox));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post(addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn first_unread(addr: SocketAddr, platform: &str) -> Value {
    let (_, listing) = get(addr, &format!("/api/messages?platform={platform}")).await;
    listing["messages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["is_unread"] == true)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn health_and_status_report_demo_mode() {
    let addr = start_server().await;
    let (code, health) = get(addr, "/health").await;
    assert_eq!(code, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["demo_mode"], true);

    let (code, status) = get(addr, "/api/status").await;
    assert_eq!(code, 200);
    assert_eq!(status["demo_mode"], true);
    for platform in ["gmail", "slack", "telegram"] {
        assert_eq!(status["platforms"][platform]["connected"], false);
    }
    assert!(status["server_time"].is_string());
}

#[tokio::test]
async fn listing_merges_all_providers() {
    let addr = start_server().await;
    let (code, listing) = get(addr, "/api/messages?limit=50").await;
    assert_eq!(code, 200);
    assert_eq!(listing["count"], 15);

    let (_, cached) = get(addr, "/api/messages/cached?platform=telegram").await;
    assert_eq!(cached["count"], 5);

    let (_, status) = get(addr, "/api/status").await;
    let per_platform: u64 = ["gmail", "slack", "telegram"]
        .iter()
        .map(|p| status["platforms"][*p]["unread"].as_u64().unwrap())
        .sum();
    assert_eq!(status["total_unread"].as_u64().unwrap(), per_platform);
}

#[tokio::test]
async fn bad_requests_map_to_error_shapes() {
    let addr = start_server().await;
    let (code, err) = get(addr, "/api/messages?platform=fax").await;
    assert_eq!(code, 400);
    assert_eq!(err["code"], "INVALID_ARGUMENT");

    let (code, err) = get(addr, "/api/messages?limit=0").await;
    assert_eq!(code, 400);
    assert_eq!(err["code"], "INVALID_ARGUMENT");

    let (code, err) = post(addr, "/api/mark-read", json!({"message_id": "gmail:nope"})).await;
    assert_eq!(code, 404);
    assert_eq!(err["code"], "NOT_FOUND");

    let (code, err) = post(addr, "/api/summarize", json!({"body": "   "})).await;
    assert_eq!(code, 422);
    assert_eq!(err["code"], "ASSIST_FAILED");
}

#[tokio::test]
async fn reply_sends_and_marks_read() {
    let addr = start_server().await;
    let target = first_unread(addr, "slack").await;
    let (_, before) = get(addr, "/api/status").await;

    let (code, outcome) = post(
        addr,
        "/api/send-reply",
        json!({"message_id": target["id"], "body": "Looking now."}),
    )
    .await;
    assert_eq!(code, 200);
    assert_eq!(outcome["sent"], true);
    assert_eq!(outcome["demo_mode"], true);

    let (_, after) = get(addr, "/api/status").await;
    assert_eq!(
        after["platforms"]["slack"]["unread"].as_u64().unwrap(),
        before["platforms"]["slack"]["unread"].as_u64().unwrap() - 1
    );

    let (code, again) = post(addr, "/api/mark-read", json!({"message_id": target["id"]})).await;
    assert_eq!(code, 200);
    assert_eq!(again, json!({"success": true, "changed": false}));
}

#[tokio::test]
async fn ai_endpoints_fall_back_locally() {
    let addr = start_server().await;
    let (code, draft) = post(
        addr,
        "/api/draft-reply",
        json!({"original_body": "Can you review the deck?", "platform": "gmail", "sender": "Ana Ruiz"}),
    )
    .await;
    assert_eq!(code, 200);
    assert!(!draft["draft"].as_str().unwrap().is_empty());
    assert!(draft["model_name"].is_string());

    let (code, status) = get(addr, "/api/ai/status").await;
    assert_eq!(code, 200);
    assert!(status["provider"].is_string());

    let (_, log) = get(addr, "/api/tool-log").await;
    assert_eq!(log["entries"][0]["tool_name"], "draft_reply");
}

#[tokio::test]
async fn thread_summary_route() {
    let addr = start_server().await;
    let target = first_unread(addr, "gmail").await;
    let (code, summary) = post(
        addr,
        "/api/summarize-thread",
        json!({"thread_id": target["thread_id"], "limit": 10}),
    )
    .await;
    assert_eq!(code, 200);
    assert_eq!(summary["thread_id"], target["thread_id"]);
    assert_eq!(summary["platform"], "gmail");
    assert!(!summary["summary"].as_str().unwrap().is_empty());

    let (code, err) = post(
        addr,
        "/api/summarize-thread",
        json!({"thread_id": "t-never-fetched"}),
    )
    .await;
    assert_eq!(code, 404);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn mcp_over_http() {
    let addr = start_server().await;
    let (code, res) = post(
        addr,
        "/mcp",
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "inbox_status"}}),
    )
    .await;
    assert_eq!(code, 200);
    assert_eq!(res["result"]["isError"], false);

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/mcp"))
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 202);
}

#[tokio::test]
async fn tool_log_socket_streams_snapshot_then_entries() {
    let addr = start_server().await;
    let (mut socket, _) = connect_async(format!("ws://{addr}/ws/tool-log")).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let snapshot: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["entries"], json!([]));

    get(addr, "/api/messages?platform=gmail").await;

    let mut statuses = Vec::new();
    while statuses.len() < 2 {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let frame: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(frame["type"], "tool_log");
        assert_eq!(frame["entry"]["tool_name"], "fetch_messages");
        assert_eq!(frame["entry"]["platform"], "gmail");
        statuses.push(frame["entry"]["status"].as_str().unwrap().to_string());
    }
    assert_eq!(statuses, ["calling", "done"]);
}
