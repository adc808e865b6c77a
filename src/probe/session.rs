//! A single WebSocket session to the probed endpoint.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::message::Greeting;
use crate::error::ProbeError;

const TLS_HINT: &str = "This build has no TLS support. Use a ws:// endpoint \
                        or rebuild tokio-tungstenite with a TLS feature enabled.";

/// Check that `endpoint` is something the probe can open without touching
/// the network.
pub fn validate_endpoint(endpoint: &str) -> Result<Uri, ProbeError> {
    let invalid = |reason: &str| ProbeError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = endpoint.parse().map_err(|e| invalid(&format!("{e}")))?;

    match uri.scheme_str() {
        Some("ws") => {}
        Some("wss") => {
            return Err(ProbeError::Unsupported {
                endpoint: endpoint.to_string(),
                hint: TLS_HINT,
            })
        }
        Some(other) => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        None => return Err(invalid("missing ws:// scheme")),
    }

    if uri.host().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(uri)
}

/// Open connection plus the message counter it owns.
pub struct Session {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    greeting: Greeting,
}

impl Session {
    /// Perform the opening handshake.
    pub async fn open(uri: Uri, prefix: &str) -> Result<Self, ProbeError> {
        let (stream, response) = connect_async(uri).await.map_err(ProbeError::Connect)?;
        debug!(status = %response.status(), "Handshake complete");

        Ok(Self {
            stream,
            greeting: Greeting::new(prefix),
        })
    }

    /// Advance the counter and build the next outgoing text.
    pub fn next_greeting(&mut self) -> (u64, String) {
        self.greeting.next_message()
    }

    pub async fn send_text(&mut self, text: String) -> Result<(), ProbeError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(ProbeError::Transport)
    }

    /// Wait for the next data frame.
    ///
    /// Control frames are skipped; binary payloads are decoded lossily.
    pub async fn recv_text(&mut self) -> Result<String, ProbeError> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(ProbeError::Transport(e)),
                None => {
                    return Err(ProbeError::Protocol(
                        "connection ended while waiting for a reply".to_string(),
                    ))
                }
            };

            match message {
                Message::Text(text) => return Ok(text),
                Message::Binary(data) => return Ok(String::from_utf8_lossy(&data).into_owned()),
                Message::Close(frame) => {
                    let detail = match frame {
                        Some(frame) => format!(" ({} {})", frame.code, frame.reason),
                        None => String::new(),
                    };
                    return Err(ProbeError::Protocol(format!(
                        "peer closed the connection while waiting for a reply{detail}"
                    )));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("Skipping control frame");
                }
            }
        }
    }

    /// Send a close frame and release the socket.
    ///
    /// Failures are logged only; the socket is dropped either way.
    pub async fn close(mut self) {
        match self.stream.close(None).await {
            Ok(()) => debug!(sent = self.greeting.count(), "Session closed"),
            Err(e) => debug!(error = %e, "Close after failure"),
        }
    }
}
