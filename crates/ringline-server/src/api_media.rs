//! Telephony media stream endpoint.
//!
//! Each upgraded socket becomes one bridged call. The socket is split into
//! a reader that decodes frames into `TelephonyEvent`s and a writer that
//! drains `TelephonyCommand`s; the session itself runs on the handler task.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use ringline_bridge::protocol::{TelephonyCommand, TelephonyEvent};
use ringline_bridge::{run_session, TelephonyLink};
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn media_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (event_tx, event_rx) = mpsc::channel::<TelephonyEvent>(256);
    let (command_tx, mut command_rx) = mpsc::channel::<TelephonyCommand>(256);

    // Closes the socket once the session drops its command sender.
    let send_task = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            let text = match serde_json::to_string(&command) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode telephony command");
                    continue;
                }
            };
            if sender.send(AxumMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(AxumMessage::Close(None)).await;
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                AxumMessage::Text(text) => {
                    match serde_json::from_str::<TelephonyEvent>(text.as_str()) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "undecodable telephony frame");
                        }
                    }
                }
                AxumMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    let outcome = run_session(
        state.bridge.clone(),
        TelephonyLink {
            events: event_rx,
            commands: command_tx,
        },
    )
    .await;

    tracing::info!(
        session_id = %outcome.session_id,
        final_state = ?outcome.final_state,
        "media stream closed"
    );

    recv_task.abort();
    if let Err(e) = send_task.await {
        tracing::warn!(error = %e, "telephony writer task failed");
    }
}
