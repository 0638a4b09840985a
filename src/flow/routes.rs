//! REST + WebSocket endpoints that let a renderer drive the flow.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::manager::{FlowEvent, FlowManager};
use super::model::ChoiceOption;
use super::slide::SlideKind;
use super::state::Transition;
use crate::error::FlowError;

/// Shared state for flow routes.
#[derive(Clone)]
pub struct FlowRouteState {
    pub manager: Arc<FlowManager>,
}

/// Body of a submit request. With every field empty, the current selection
/// is submitted as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub option_id: String,
}

/// Actions a WebSocket client can send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowAction {
    Toggle { option_id: String },
    Submit(SubmitRequest),
    Acknowledge,
    Back,
}

/// Build the flow router.
pub fn flow_routes(manager: Arc<FlowManager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/flow", get(get_status))
        .route("/api/flow/selections/{slide_id}", get(get_selections))
        .route("/api/flow/toggle", post(toggle))
        .route("/api/flow/submit", post(submit))
        .route("/api/flow/acknowledge", post(acknowledge))
        .route("/api/flow/back", post(back))
        .with_state(FlowRouteState { manager })
}

fn error_response(error: FlowError) -> Response {
    let status = match error {
        FlowError::OptionNotFound { .. } => StatusCode::NOT_FOUND,
        FlowError::NotSelectable { .. } | FlowError::UnexpectedInput { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FlowError::EmptyFlow | FlowError::DuplicateSlideId { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(serde_json::json!({"error": error.to_string()}))).into_response()
}

async fn apply_submit(
    manager: &FlowManager,
    request: SubmitRequest,
) -> Result<Transition, FlowError> {
    match request {
        SubmitRequest {
            option_ids: Some(ids),
            ..
        } => manager.submit_options(&ids).await,
        SubmitRequest {
            text: Some(text), ..
        } => {
            manager
                .submit_input(SlideKind::TextInput, ChoiceOption::text(text))
                .await
        }
        SubmitRequest {
            date: Some(date), ..
        } => {
            manager
                .submit_input(SlideKind::DatePicker, ChoiceOption::date(date))
                .await
        }
        _ => Ok(manager.submit_current().await),
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "onboarding-flow"
    }))
}

// ── REST Endpoints ──────────────────────────────────────────────────────

/// GET /api/flow
async fn get_status(State(state): State<FlowRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

/// GET /api/flow/selections/{slide_id}
///
/// Unknown slides answer with an empty list, like unanswered ones.
async fn get_selections(
    State(state): State<FlowRouteState>,
    Path(slide_id): Path<String>,
) -> impl IntoResponse {
    Json(state.manager.selections(&slide_id).await)
}

/// POST /api/flow/toggle
async fn toggle(
    State(state): State<FlowRouteState>,
    Json(request): Json<ToggleRequest>,
) -> Response {
    match state.manager.toggle_option(&request.option_id).await {
        Ok(selections) => Json(serde_json::json!({"selections": selections})).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/flow/submit
async fn submit(
    State(state): State<FlowRouteState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    match apply_submit(&state.manager, request).await {
        Ok(transition) => Json(transition).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/flow/acknowledge
async fn acknowledge(State(state): State<FlowRouteState>) -> impl IntoResponse {
    let transition = state.manager.acknowledge_response().await;
    Json(transition)
}

/// POST /api/flow/back
async fn back(State(state): State<FlowRouteState>) -> impl IntoResponse {
    let moved = state.manager.go_back().await;
    Json(serde_json::json!({
        "moved": moved,
        "current_index": state.manager.snapshot().await.current_index,
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<FlowRouteState>) -> impl IntoResponse {
    info!("Flow observer connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.manager))
}

async fn send_sync(socket: &mut WebSocket, manager: &FlowManager) -> bool {
    let sync = FlowEvent::Sync {
        status: manager.status().await,
    };
    match serde_json::to_string(&sync) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize flow sync");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, manager: Arc<FlowManager>) {
    // Subscribe before the initial sync so no event slips in between.
    let mut rx = manager.subscribe();

    if !send_sync(&mut socket, &manager).await {
        warn!("Failed to send initial sync, observer disconnected");
        return;
    }
    info!(session_id = %manager.session_id(), "Flow observer connected");

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                debug!("Observer disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Flow observer lagged behind broadcast");
                        if !send_sync(&mut socket, &manager).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Flow event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &manager).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Flow observer disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn handle_client_message(text: &str, manager: &FlowManager) {
    let action = match serde_json::from_str::<FlowAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from observer");
            return;
        }
    };
    match action {
        FlowAction::Toggle { option_id } => {
            if let Err(e) = manager.toggle_option(&option_id).await {
                warn!(option_id = %option_id, error = %e, "Toggle failed via WS");
            }
        }
        FlowAction::Submit(request) => {
            if let Err(e) = apply_submit(manager, request).await {
                warn!(error = %e, "Submit failed via WS");
            }
        }
        FlowAction::Acknowledge => {
            manager.acknowledge_response().await;
        }
        FlowAction::Back => {
            manager.go_back().await;
        }
    }
}
