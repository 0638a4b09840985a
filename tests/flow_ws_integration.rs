//! Integration tests for the flow WebSocket + REST surface.
//!
//! Each test spins up an Axum server on a random port, connects via
//! tokio-tungstenite, and drives the flow the way a renderer would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use onboarding_flow::config::FlowConfig;
use onboarding_flow::flow::{FlowDefinition, FlowManager, flow_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const FLOW: &str = r#"{
    "slides": [
        {"kind": "regular", "id": "welcome", "title": "Welcome"},
        {"kind": "rating", "id": "mood", "title": "How are you?", "scale": 5,
         "rules": [
            {"min": 1, "max": 2,
             "insert": [{"placement": {"type": "next"},
                         "slide": {"kind": "text_input", "id": "why", "title": "Why?"}}]}
         ]},
        {"kind": "yes_no", "id": "newsletter", "title": "Newsletter?",
         "no": {"id": "no", "content": {"type": "flag", "value": false},
                "response_configuration": {"title": "Maybe later"}}},
        {"kind": "primary_action", "id": "done", "title": "Done"}
    ]
}"#;

/// Start an Axum server on a random port, return (port, manager).
async fn start_server() -> (u16, Arc<FlowManager>) {
    let (header, state) = FlowDefinition::from_json_str(FLOW)
        .unwrap()
        .into_state()
        .unwrap();
    let config = FlowConfig {
        auto_advance_delay: Duration::from_millis(20),
        ..FlowConfig::default()
    };
    let manager = FlowManager::new(state, header, config);
    let app = flow_routes(Arc::clone(&manager));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, manager)
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

/// Read frames until one with the given `type` arrives.
async fn wait_for<S>(ws: &mut S, event_type: &str) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = ws.next().await.expect("stream ended").expect("ws error");
        let json = parse_ws_json(&msg);
        if json["type"] == event_type {
            return json;
        }
    }
}

fn action(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_connect_receives_sync() {
    timeout(TEST_TIMEOUT, async {
        let (port, manager) = start_server().await;

        let (mut ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .expect("WS connect failed");

        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);

        assert_eq!(json["type"], "sync");
        assert_eq!(json["status"]["current_index"], 0);
        assert_eq!(json["status"]["current_slide"]["id"], "welcome");
        assert_eq!(json["status"]["session_id"], manager.session_id().to_string());
        assert_eq!(json["status"]["slide_count"], 4);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_rating_auto_advances_into_inserted_slide() {
    timeout(TEST_TIMEOUT, async {
        let (port, manager) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        wait_for(&mut ws, "sync").await;

        ws.send(action(serde_json::json!({"action": "submit"})))
            .await
            .unwrap();
        let advanced = wait_for(&mut ws, "advanced").await;
        assert_eq!(advanced["slide_id"], "mood");

        // A low rating auto-advances and splices in the follow-up question.
        ws.send(action(serde_json::json!({"action": "toggle", "option_id": "2"})))
            .await
            .unwrap();
        let changed = wait_for(&mut ws, "selection_changed").await;
        assert_eq!(changed["selections"][0]["id"], "2");

        let inserted = wait_for(&mut ws, "slides_inserted").await;
        assert_eq!(inserted["after_slide_id"], "mood");
        assert_eq!(inserted["slide_ids"], serde_json::json!(["why"]));

        let advanced = wait_for(&mut ws, "advanced").await;
        assert_eq!(advanced["slide_id"], "why");
        assert_eq!(manager.snapshot().await.slide_count, 5);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_response_then_completion() {
    timeout(TEST_TIMEOUT, async {
        let (port, manager) = start_server().await;
        manager.submit_current().await;
        manager.toggle_option("5").await.unwrap();
        manager.cancel_pending().await;
        manager.submit_current().await;
        assert_eq!(manager.current_slide().await.id(), "newsletter");

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        let sync = wait_for(&mut ws, "sync").await;
        assert_eq!(sync["status"]["current_slide"]["id"], "newsletter");

        ws.send(action(serde_json::json!({"action": "submit", "option_ids": ["no"]})))
            .await
            .unwrap();
        let presented = wait_for(&mut ws, "response_presented").await;
        assert_eq!(presented["configuration"]["title"], "Maybe later");

        ws.send(action(serde_json::json!({"action": "acknowledge"})))
            .await
            .unwrap();
        wait_for(&mut ws, "response_dismissed").await;
        let advanced = wait_for(&mut ws, "advanced").await;
        assert_eq!(advanced["slide_id"], "done");

        ws.send(action(serde_json::json!({"action": "submit"})))
            .await
            .unwrap();
        let completed = wait_for(&mut ws, "completed").await;
        let summary = &completed["summary"];
        assert_eq!(summary["session_id"], manager.session_id().to_string());
        assert_eq!(summary["selections"]["mood"][0]["id"], "5");
        assert_eq!(summary["selections"]["newsletter"][0]["id"], "no");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_back_and_bad_messages() {
    timeout(TEST_TIMEOUT, async {
        let (port, manager) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        wait_for(&mut ws, "sync").await;

        // Garbage and invalid toggles are ignored without closing the socket.
        ws.send(Message::Text("not json".into())).await.unwrap();
        ws.send(action(serde_json::json!({"action": "toggle", "option_id": "nope"})))
            .await
            .unwrap();

        ws.send(action(serde_json::json!({"action": "submit"})))
            .await
            .unwrap();
        wait_for(&mut ws, "advanced").await;

        ws.send(action(serde_json::json!({"action": "back"})))
            .await
            .unwrap();
        let back = wait_for(&mut ws, "went_back").await;
        assert_eq!(back["to"], 0);
        assert_eq!(back["slide_id"], "welcome");
        assert_eq!(manager.snapshot().await.current_index, 0);
    })
    .await
    .expect("test timed out");
}

// ── REST Endpoint Tests ──────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (port, _manager) = start_server().await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["service"], "onboarding-flow");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_submit_is_broadcast_to_ws() {
    timeout(TEST_TIMEOUT, async {
        let (port, _manager) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        wait_for(&mut ws, "sync").await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/flow/submit"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["outcome"], "advanced");

        let advanced = wait_for(&mut ws, "advanced").await;
        assert_eq!(advanced["slide_id"], "mood");

        let status: Value = reqwest::get(format!("http://127.0.0.1:{port}/api/flow"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["current_index"], 1);
        assert_eq!(status["current_slide"]["kind"], "rating");
        assert_eq!(status["header"]["show_back_button"], true);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_toggle_unknown_option_returns_404() {
    timeout(TEST_TIMEOUT, async {
        let (port, manager) = start_server().await;
        manager.submit_current().await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/flow/toggle"))
            .json(&serde_json::json!({"option_id": "11"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert!(manager.current_selections().await.is_empty());
    })
    .await
    .expect("test timed out");
}
