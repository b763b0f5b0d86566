use std::sync::Arc;

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    chatnest_config::ChatnestConfig,
    chatnest_inbox::InboxService,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{routes, state::AppState, ws};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::status))
        .route("/api/messages", get(routes::list_messages))
        .route("/api/messages/cached", get(routes::cached_messages))
        .route("/api/refresh", post(routes::refresh))
        .route("/api/mark-read", post(routes::mark_read))
        .route("/api/send-reply", post(routes::send_reply))
        .route("/api/summarize", post(routes::summarize))
        .route("/api/summarize-thread", post(routes::summarize_thread))
        .route("/api/draft-reply", post(routes::draft_reply))
        .route("/api/ai/status", get(routes::ai_status))
        .route("/api/tool-log", get(routes::tool_log))
        .route("/ws/tool-log", get(ws::tool_log_upgrade))
        .route("/mcp", post(mcp_handler));

    #[cfg(feature = "metrics")]
    let router = router.route_layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the gateway until Ctrl-C.
pub async fn start_gateway(cfg: &ChatnestConfig, inbox: Arc<InboxService>) -> anyhow::Result<()> {
    let app = build_gateway_app(AppState::new(inbox));
    let listener = tokio::net::TcpListener::bind((cfg.server.bind.as_str(), cfg.server.port)).await?;
    info!(addr = %listener.local_addr()?, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// JSON-RPC over HTTP. Notifications are acknowledged with 202 and no body.
async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let text = String::from_utf8_lossy(&body);
    match state.mcp.handle_text(&text).await {
        Some(response) => ([(header::CONTENT_TYPE, "application/json")], response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
