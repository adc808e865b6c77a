//! Protocol implementations.
//!
//! - `echo`: WebSocket echo endpoint on `/ws`, used by `serve`

pub mod echo;
