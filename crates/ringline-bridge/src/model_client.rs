//! Connection to the speech model.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{ModelCommand, ModelEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;

/// Both directions of an open model channel.
///
/// Dropping `commands` closes the connection; `events` ends when the model
/// side goes away.
#[derive(Debug)]
pub struct ModelLink {
    pub events: mpsc::Receiver<ModelEvent>,
    pub commands: mpsc::Sender<ModelCommand>,
}

/// Opens model channels. One call per session.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    async fn connect(&self, config: &BridgeConfig) -> Result<ModelLink, BridgeError>;
}

/// WebSocket client for the realtime speech API.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealtimeConnector;

#[async_trait]
impl ModelConnector for RealtimeConnector {
    async fn connect(&self, config: &BridgeConfig) -> Result<ModelLink, BridgeError> {
        let mut request = config
            .model_url
            .as_str()
            .into_client_request()
            .map_err(|e| BridgeError::Connection(format!("invalid model url: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| BridgeError::Connection("api key is not a valid header value".into()))?;
        let headers = request.headers_mut();
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| BridgeError::Connection(format!("model connect failed: {}", e)))?;
        let (mut sink, mut stream) = ws.split();

        let (event_tx, event_rx) = mpsc::channel::<ModelEvent>(256);
        let (command_tx, mut command_rx) = mpsc::channel::<ModelCommand>(256);

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode model command");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ModelEvent>(text.as_str()) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "undecodable model frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "model channel read failed");
                        break;
                    }
                }
            }
            tracing::debug!("model channel reader finished");
        });

        Ok(ModelLink {
            events: event_rx,
            commands: command_tx,
        })
    }
}
