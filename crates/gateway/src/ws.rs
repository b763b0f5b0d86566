//! Tool-log WebSocket: one `snapshot` frame, then one `tool_log` frame per
//! telemetry event, and a `ping` after 30 s without traffic.
//!
//! A connection whose subscriber falls behind is closed; clients reconnect
//! after a short backoff and start again from a fresh snapshot.

use std::{sync::Arc, time::Duration};

use {
    axum::{
        extract::{
            State, WebSocketUpgrade,
            ws::{Message, WebSocket},
        },
        response::IntoResponse,
    },
    chatnest_protocol::{PING_INTERVAL_MS, TelemetryFrame},
    chatnest_telemetry::{BusEvent, TelemetryBus},
    futures::{SinkExt, stream::StreamExt},
    tracing::{debug, info},
};

use crate::state::AppState;

pub async fn tool_log_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let bus = Arc::clone(state.inbox.telemetry());
    ws.on_upgrade(move |socket| handle_tool_log(socket, bus))
}

pub async fn handle_tool_log(socket: WebSocket, bus: Arc<TelemetryBus>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "tool-log: new connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut events = bus.subscribe();
    let idle = Duration::from_millis(PING_INTERVAL_MS);

    loop {
        tokio::select! {
            event = tokio::time::timeout(idle, events.recv()) => {
                let frame = match event {
                    Ok(Some(BusEvent::Snapshot(entries))) => TelemetryFrame::snapshot(&entries),
                    Ok(Some(BusEvent::Entry(entry))) => TelemetryFrame::entry(&entry),
                    Ok(None) => {
                        info!(conn_id = %conn_id, "tool-log: subscriber dropped, closing");
                        break;
                    },
                    Err(_) => TelemetryFrame::Ping,
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(conn_id = %conn_id, error = %e, "tool-log: unserializable frame");
                        continue;
                    },
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    debug!(conn_id = %conn_id, "tool-log: write failed");
                    break;
                }
            },
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Client keepalives carry nothing we act on.
                Some(Ok(_)) => {},
            },
        }
    }

    let _ = ws_tx.close().await;
    info!(conn_id = %conn_id, "tool-log: connection closed");
}
