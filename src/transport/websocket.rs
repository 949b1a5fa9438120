use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::Arc;

use crate::broker::Broker;
use crate::transport::message::{ClientMessage, ServerMessage};

/// Serves the publish endpoint.
///
/// Producers connect over WebSocket, send publish frames and receive the
/// assigned message id (or an error) back on the same connection. The
/// broker handles each publish synchronously, so a `published` reply means
/// every matching queue has accepted its copy.
pub async fn start_websocket_server(addr: &str, broker: Arc<Broker>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "publish endpoint listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "failed to accept connection");
                continue;
            }
        };
        let broker = broker.clone();

        tokio::spawn(async move {
            let mut ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    warn!(%peer, error = %err, "websocket handshake failed");
                    return;
                }
            };

            while let Some(Ok(frame)) = ws.next().await {
                if !frame.is_text() {
                    continue;
                }
                let Ok(text) = frame.to_text() else { continue };

                let reply = match serde_json::from_str::<ClientMessage>(text) {
                    Ok(ClientMessage::Publish {
                        topic,
                        body,
                        attributes,
                    }) => match broker.publish(&topic, body, attributes) {
                        Ok(id) => {
                            info!(%peer, topic, %id, "published");
                            ServerMessage::Published { id }
                        }
                        Err(err) => {
                            warn!(%peer, topic, error = %err, "publish rejected");
                            ServerMessage::Error {
                                reason: err.to_string(),
                            }
                        }
                    },
                    Err(err) => ServerMessage::Error {
                        reason: format!("invalid frame: {err}"),
                    },
                };

                let json = match serde_json::to_string(&reply) {
                    Ok(json) => json,
                    Err(err) => {
                        error!(error = %err, "failed to serialize reply");
                        continue;
                    }
                };
                if let Err(err) = ws.send(WsMessage::text(json)).await {
                    warn!(%peer, error = %err, "failed to send reply");
                    break;
                }
            }

            info!(%peer, "producer disconnected");
        });
    }
}
