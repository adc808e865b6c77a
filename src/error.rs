//! Error types for the probe.
//!
//! Every error is terminal: the probe never retries, it reports and exits.

use tokio_tungstenite::tungstenite;

/// Errors that end a probe run.
#[derive(Debug)]
pub enum ProbeError {
    /// The endpoint is not a usable WebSocket URI.
    InvalidEndpoint { endpoint: String, reason: String },
    /// The endpoint needs a capability this build does not carry.
    Unsupported { endpoint: String, hint: &'static str },
    /// The opening handshake failed.
    Connect(tungstenite::Error),
    /// The socket failed while sending or receiving.
    Transport(tungstenite::Error),
    /// The connection closed while a reply was expected.
    Protocol(String),
}

impl ProbeError {
    /// Remediation hint for errors that are fixed by rebuilding or
    /// reconfiguring rather than by the device.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ProbeError::Unsupported { hint, .. } => Some(hint),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::InvalidEndpoint { endpoint, reason } => {
                write!(f, "invalid endpoint '{endpoint}': {reason}")
            }
            ProbeError::Unsupported { endpoint, .. } => {
                write!(f, "secure WebSocket support not available for '{endpoint}'")
            }
            ProbeError::Connect(e) => write!(f, "connection failed: {e}"),
            ProbeError::Transport(e) => write!(f, "transport error: {e}"),
            ProbeError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Connect(e) | ProbeError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
