//! Echo protocol implementation.
//!
//! Behaves like the device firmware the probe is pointed at, so the probe
//! can be exercised on a workstation:
//!
//! ```text
//! GET /ws  (WebSocket upgrade)   -> 101, then every text/binary frame
//!                                   is sent back unchanged
//! GET /any-other-path            -> 404, no upgrade
//! ```
//!
//! ## Use Cases
//!
//! 1. **Probe development**: run `ws-echo-probe serve` in one terminal and
//!    `ws-echo-probe probe -e ws://127.0.0.1:8080/ws` in another.
//!
//! 2. **Correctness validation**: every "Received" line on the probe side
//!    should equal the preceding "Sending" line.
//!
//! Close frames end the connection. Pings are answered automatically.

pub mod handler;

pub use handler::handle_connection;
