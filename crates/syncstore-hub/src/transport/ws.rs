//! WebSocket relay handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Take the peer's origin from the upgrade request (`Origin` header, or the
//!   opaque `"null"` when absent)
//! - Register the connection (it is greeted with the hub status) so replies
//!   to its own requests reach it
//! - Forward text frames to the listener queue; write queued replies back

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use syncstore_core::error::Result;

use crate::app_state::AppState;

use super::codec::{decode, frame_len, Inbound};
use super::port::OPAQUE_ORIGIN;

pub async fn ws_upgrade(
    State(app): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or(OPAQUE_ORIGIN)
        .to_string();

    ws.on_upgrade(move |socket| {
        let span = tracing::info_span!("peer", origin = %origin);
        async move {
            if let Err(e) = run_peer(app, origin, socket).await {
                tracing::debug!(error = %e, "peer session ended with error");
            }
        }
        .instrument(span)
    })
}

async fn run_peer(app: AppState, origin: String, socket: WebSocket) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(app.cfg().server.outbound_queue);
    let peer_id = app.connect(&origin, out_tx.clone());
    tracing::debug!(peer_id, "peer connected");

    let max_bytes = app.cfg().server.max_message_bytes;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let result = loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break Ok(()) };
                if ws_tx.send(m).await.is_err() {
                    break Ok(());
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break Ok(()) };

                let len = frame_len(&msg);
                if len > max_bytes {
                    tracing::debug!(peer_id, len, max_bytes, "frame over size limit dropped");
                    continue;
                }

                match decode(msg, peer_id, &origin) {
                    Inbound::Event(ev) => {
                        if let Err(e) = app.enqueue(ev).await {
                            break Err(e);
                        }
                    }
                    Inbound::Ping(payload) => {
                        let _ = out_tx.try_send(Message::Pong(payload));
                    }
                    Inbound::Pong | Inbound::Ignored => {}
                    Inbound::Close => break Ok(()),
                }
            }
        }
    };

    app.disconnect(peer_id);
    tracing::debug!(peer_id, "peer disconnected");
    result
}
