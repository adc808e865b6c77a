//! Probe event reporting.
//!
//! The probe never prints directly. Events flow through a [`Reporter`] so the
//! console binary and the tests observe the same sequence.

use tracing::{debug, info, warn};

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Connecting { endpoint: String },
    Connected,
    Sending { seq: u64, message: String },
    Received { seq: u64, message: String },
    Stopped,
    Failed {
        description: String,
        hint: Option<String>,
    },
}

pub trait Reporter {
    fn report(&mut self, event: ProbeEvent);
}

/// Prints operator lines to stdout and mirrors each event into the log.
#[derive(Debug, Default)]
pub struct Console;

impl Reporter for Console {
    fn report(&mut self, event: ProbeEvent) {
        match event {
            ProbeEvent::Connecting { endpoint } => {
                info!(endpoint = %endpoint, "Connecting");
                println!("Connecting to {endpoint}...");
            }
            ProbeEvent::Connected => {
                info!("Connected");
                println!("Connected!");
            }
            ProbeEvent::Sending { seq, message } => {
                debug!(seq, len = message.len(), "Sending greeting");
                println!("Sending: {message}");
            }
            ProbeEvent::Received { seq, message } => {
                debug!(seq, len = message.len(), "Received reply");
                println!("Received: {message}");
            }
            ProbeEvent::Stopped => {
                info!("Stopped by user");
                // ^C leaves the cursor mid-line
                println!("\nStopped by user");
            }
            ProbeEvent::Failed { description, hint } => {
                warn!(error = %description, "Probe failed");
                println!("Error: {description}");
                if let Some(hint) = hint {
                    println!("{hint}");
                }
            }
        }
    }
}

impl Reporter for Vec<ProbeEvent> {
    fn report(&mut self, event: ProbeEvent) {
        self.push(event);
    }
}
