//! Echo protocol handler for the Tokio runtime.

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};

/// The only path that upgrades to a WebSocket.
pub const ECHO_PATH: &str = "/ws";

/// Handle one echo connection.
///
/// Performs the handshake (rejecting any path other than [`ECHO_PATH`] with
/// 404), then sends every text and binary frame straight back. `echoed` is
/// shared across connections and counts frames sent back.
pub async fn handle_connection(
    stream: TcpStream,
    echoed: Arc<AtomicU64>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut ws = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    info!("Handshake done, new connection opened");

    while let Some(message) = ws.next().await {
        let message = message?;

        match message {
            Message::Text(ref text) => {
                info!(message = %text, "Received");
            }
            Message::Binary(ref data) => {
                debug!(len = data.len(), "Received binary");
            }
            // the next read flushes the close reply and ends the stream
            Message::Close(_) => {
                trace!("Connection closed by client");
                continue;
            }
            // pings are answered by the websocket layer
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        }

        ws.send(message).await?;
        let total = echoed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(total, activity = total % 2 == 1, "Echoed");
    }

    Ok(())
}

fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    let path = request.uri().path();
    if path == ECHO_PATH {
        return Ok(response);
    }

    debug!(path, "Rejecting upgrade");
    let mut rejection = ErrorResponse::new(Some(format!("no websocket handler for {path}")));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}
