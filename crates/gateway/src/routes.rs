//! REST handlers over [`chatnest_inbox::InboxService`].

use {
    axum::{
        Json,
        extract::{Query, State},
        response::IntoResponse,
    },
    chatnest_assist::DraftRequest,
    chatnest_common::MessageScope,
    chatnest_inbox::{ReplyRequest, SummarizeRequest, SummarizeThreadRequest},
    chatnest_protocol::ToolLogRow,
    serde::Deserialize,
    serde_json::{Value, json},
};

use crate::{error::ApiError, state::AppState};

type ApiResult = Result<Json<Value>, ApiError>;

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ApiError::invalid(format!("unserializable response: {e}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub platform: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub message_id: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "demo_mode": state.inbox.gate().demo_mode(),
    }))
}

pub async fn status(State(state): State<AppState>) -> ApiResult {
    to_json(&state.inbox.status())
}

pub async fn list_messages(State(state): State<AppState>, Query(q): Query<ListQuery>) -> ApiResult {
    let scope = MessageScope::parse(q.platform.as_deref())?;
    let messages = state.inbox.list_messages(scope, q.limit).await?;
    Ok(Json(json!({ "count": messages.len(), "messages": messages })))
}

pub async fn cached_messages(State(state): State<AppState>, Query(q): Query<ListQuery>) -> ApiResult {
    let scope = MessageScope::parse(q.platform.as_deref())?;
    let messages = state.inbox.cached_messages(scope, q.limit)?;
    Ok(Json(json!({ "count": messages.len(), "messages": messages })))
}

pub async fn refresh(State(state): State<AppState>) -> ApiResult {
    to_json(&state.inbox.refresh().await)
}

pub async fn mark_read(State(state): State<AppState>, Json(body): Json<MarkReadBody>) -> ApiResult {
    let changed = state.inbox.mark_read(&body.message_id).await?;
    Ok(Json(json!({ "success": true, "changed": changed })))
}

pub async fn send_reply(State(state): State<AppState>, Json(body): Json<ReplyRequest>) -> ApiResult {
    to_json(&state.inbox.send_reply(body).await?)
}

pub async fn summarize(State(state): State<AppState>, Json(body): Json<SummarizeRequest>) -> ApiResult {
    to_json(&state.inbox.summarize(body).await?)
}

pub async fn summarize_thread(
    State(state): State<AppState>,
    Json(body): Json<SummarizeThreadRequest>,
) -> ApiResult {
    to_json(&state.inbox.summarize_thread(body).await?)
}

pub async fn draft_reply(State(state): State<AppState>, Json(body): Json<DraftRequest>) -> ApiResult {
    to_json(&state.inbox.draft_reply(body).await?)
}

pub async fn ai_status(State(state): State<AppState>) -> ApiResult {
    to_json(&state.inbox.ai_status().await)
}

/// Current tool-log window, newest first.
pub async fn tool_log(State(state): State<AppState>) -> impl IntoResponse {
    let entries: Vec<ToolLogRow> = state
        .inbox
        .telemetry()
        .snapshot()
        .iter()
        .map(ToolLogRow::from)
        .collect();
    Json(json!({ "entries": entries }))
}
