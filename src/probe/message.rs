//! Greeting construction.

/// Counter-stamped greeting source.
///
/// The counter starts at zero and is bumped before every message, so the
/// first greeting carries `#1`.
#[derive(Debug, Clone)]
pub struct Greeting {
    prefix: String,
    count: u64,
}

impl Greeting {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            count: 0,
        }
    }

    /// Advance the counter and return `(n, text)` for the next message.
    pub fn next_message(&mut self) -> (u64, String) {
        self.count += 1;
        (self.count, format_greeting(&self.prefix, self.count))
    }

    /// Number of greetings produced so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Format a greeting: `<prefix> Message #<n>`.
pub fn format_greeting(prefix: &str, seq: u64) -> String {
    if prefix.is_empty() {
        format!("Message #{seq}")
    } else {
        format!("{prefix} Message #{seq}")
    }
}
