//! Echo probe.
//!
//! Opens one WebSocket session to a device and loops forever:
//!
//! ```text
//! Sending: Hello ESP32! Message #1
//! Received: Hello ESP32! Message #1
//! (sleep interval)
//! Sending: Hello ESP32! Message #2
//! ...
//! ```
//!
//! There are no retries. The first error of any kind ends the run, and an
//! interrupt ends it cleanly. The session is closed on every exit path.

pub mod message;
pub mod report;
pub mod session;

use std::future::Future;

use tracing::debug;

use crate::config::ProbeSettings;
use crate::error::ProbeError;
use report::{ProbeEvent, Reporter};
use session::{validate_endpoint, Session};

/// How a probe run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The shutdown signal fired.
    Stopped,
    /// The configured message limit was reached.
    Completed { sent: u64 },
}

pub struct EchoProbe {
    settings: ProbeSettings,
}

impl EchoProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    /// Run until `shutdown` resolves, the message limit is hit, or an error
    /// occurs. Errors are reported before being returned.
    pub async fn run<R, F>(&self, reporter: &mut R, shutdown: F) -> Result<Outcome, ProbeError>
    where
        R: Reporter,
        F: Future<Output = ()>,
    {
        let result = self.run_inner(reporter, shutdown).await;

        match &result {
            Ok(Outcome::Stopped) => reporter.report(ProbeEvent::Stopped),
            Ok(Outcome::Completed { sent }) => debug!(sent, "Message limit reached"),
            Err(e) => reporter.report(ProbeEvent::Failed {
                description: e.to_string(),
                hint: e.hint().map(str::to_string),
            }),
        }

        result
    }

    async fn run_inner<R, F>(&self, reporter: &mut R, shutdown: F) -> Result<Outcome, ProbeError>
    where
        R: Reporter,
        F: Future<Output = ()>,
    {
        let uri = validate_endpoint(&self.settings.endpoint)?;
        tokio::pin!(shutdown);

        reporter.report(ProbeEvent::Connecting {
            endpoint: self.settings.endpoint.clone(),
        });

        let mut session = tokio::select! {
            opened = Session::open(uri, &self.settings.prefix) => opened?,
            _ = &mut shutdown => return Ok(Outcome::Stopped),
        };

        reporter.report(ProbeEvent::Connected);

        let result = tokio::select! {
            exchanged = self.exchange(&mut session, reporter) => exchanged,
            _ = &mut shutdown => Ok(Outcome::Stopped),
        };

        session.close().await;
        result
    }

    /// The send/receive/sleep loop. Only returns on error or message limit.
    async fn exchange<R: Reporter>(
        &self,
        session: &mut Session,
        reporter: &mut R,
    ) -> Result<Outcome, ProbeError> {
        if self.settings.max_messages == Some(0) {
            return Ok(Outcome::Completed { sent: 0 });
        }

        loop {
            let (seq, message) = session.next_greeting();

            reporter.report(ProbeEvent::Sending {
                seq,
                message: message.clone(),
            });
            session.send_text(message).await?;

            let reply = session.recv_text().await?;
            reporter.report(ProbeEvent::Received {
                seq,
                message: reply,
            });

            if self.settings.max_messages.is_some_and(|max| seq >= max) {
                return Ok(Outcome::Completed { sent: seq });
            }

            tokio::time::sleep(self.settings.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSettings;
    use crate::server::Server;
    use futures_util::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_test::assert_ok;
    use tokio_tungstenite::tungstenite::Message;

    fn settings(endpoint: String, interval_ms: u64, max_messages: Option<u64>) -> ProbeSettings {
        ProbeSettings {
            endpoint,
            interval: Duration::from_millis(interval_ms),
            prefix: "Hello ESP32!".to_string(),
            max_messages,
        }
    }

    async fn start_echo_server() -> SocketAddr {
        let server = Server::new(&ServerSettings {
            listen: "127.0.0.1:0".to_string(),
            max_connections: 4,
        });
        let listener = assert_ok!(server.bind().await);
        let addr = assert_ok!(listener.local_addr());
        tokio::spawn(async move {
            let _ = server.serve(listener, std::future::pending::<()>()).await;
        });
        addr
    }

    fn sent_and_received(events: &[ProbeEvent]) -> (Vec<(u64, String)>, Vec<(u64, String)>) {
        let mut sent = Vec::new();
        let mut received = Vec::new();
        for event in events {
            match event {
                ProbeEvent::Sending { seq, message } => sent.push((*seq, message.clone())),
                ProbeEvent::Received { seq, message } => received.push((*seq, message.clone())),
                _ => {}
            }
        }
        (sent, received)
    }

    #[tokio::test]
    async fn test_echo_round_trips() {
        let addr = start_echo_server().await;
        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, Some(5)));

        let mut events: Vec<ProbeEvent> = Vec::new();
        let outcome = assert_ok!(probe.run(&mut events, std::future::pending()).await);
        assert_eq!(outcome, Outcome::Completed { sent: 5 });

        assert_eq!(
            events[0],
            ProbeEvent::Connecting {
                endpoint: format!("ws://{addr}/ws")
            }
        );
        assert_eq!(events[1], ProbeEvent::Connected);

        let (sent, received) = sent_and_received(&events);
        assert_eq!(sent.len(), 5);
        assert_eq!(sent, received);
        for (i, (seq, message)) in sent.iter().enumerate() {
            assert_eq!(*seq, i as u64 + 1);
            assert_eq!(message, &format!("Hello ESP32! Message #{seq}"));
        }
    }

    #[tokio::test]
    async fn test_zero_message_limit_sends_nothing() {
        let addr = start_echo_server().await;
        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, Some(0)));

        let mut events: Vec<ProbeEvent> = Vec::new();
        let outcome = assert_ok!(probe.run(&mut events, std::future::pending()).await);
        assert_eq!(outcome, Outcome::Completed { sent: 0 });

        let (sent, received) = sent_and_received(&events);
        assert!(sent.is_empty());
        assert!(received.is_empty());
        assert_eq!(events.last(), Some(&ProbeEvent::Connected));
    }

    #[tokio::test]
    async fn test_interval_between_iterations() {
        let addr = start_echo_server().await;
        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 50, Some(3)));

        let start = Instant::now();
        let mut events: Vec<ProbeEvent> = Vec::new();
        assert_ok!(probe.run(&mut events, std::future::pending()).await);

        // two sleeps separate three iterations
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_connect_failure_skips_loop() {
        // grab a free port, then release it so nothing is listening
        let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
        let addr = assert_ok!(listener.local_addr());
        drop(listener);

        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, None));
        let mut events: Vec<ProbeEvent> = Vec::new();
        let err = probe
            .run(&mut events, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Connect(_)));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProbeEvent::Connecting { .. }));
        assert!(matches!(events[1], ProbeEvent::Failed { hint: None, .. }));
    }

    #[tokio::test]
    async fn test_wss_fails_before_connecting() {
        let probe = EchoProbe::new(settings("wss://127.0.0.1:1/ws".to_string(), 0, None));
        let mut events: Vec<ProbeEvent> = Vec::new();
        let err = probe
            .run(&mut events, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Unsupported { .. }));
        assert_eq!(events.len(), 1);
        match &events[0] {
            ProbeEvent::Failed { hint, .. } => assert!(hint.is_some()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_interrupt_while_waiting_for_reply() {
        let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
        let addr = assert_ok!(listener.local_addr());
        let (got_first, interrupt) = oneshot::channel::<()>();

        // peer reads one greeting, never answers, then reports whether the
        // probe closed the connection
        let peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            let _ = got_first.send(());
            let next = ws.next().await;
            (first, next)
        });

        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, None));
        let mut events: Vec<ProbeEvent> = Vec::new();
        let shutdown = async {
            let _ = interrupt.await;
        };
        let outcome = assert_ok!(probe.run(&mut events, shutdown).await);
        assert_eq!(outcome, Outcome::Stopped);
        assert_eq!(events.last(), Some(&ProbeEvent::Stopped));

        let (first, next) = assert_ok!(peer.await);
        assert_eq!(first, Message::Text("Hello ESP32! Message #1".to_string()));
        assert!(matches!(next, Some(Ok(Message::Close(_)))));
    }

    #[tokio::test]
    async fn test_interrupt_between_iterations() {
        let addr = start_echo_server().await;
        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 60_000, None));

        let mut events: Vec<ProbeEvent> = Vec::new();
        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        let outcome = assert_ok!(probe.run(&mut events, shutdown).await);
        assert_eq!(outcome, Outcome::Stopped);

        let (sent, received) = sent_and_received(&events);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent, received);
        assert_eq!(events.last(), Some(&ProbeEvent::Stopped));
    }

    #[tokio::test]
    async fn test_peer_close_is_protocol_error() {
        let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
        let addr = assert_ok!(listener.local_addr());

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await;
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        });

        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, None));
        let mut events: Vec<ProbeEvent> = Vec::new();
        let err = probe
            .run(&mut events, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Protocol(_)));
        assert!(matches!(events.last(), Some(ProbeEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_binary_and_ping_replies() {
        let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
        let addr = assert_ok!(listener.local_addr());

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await;
            ws.send(Message::Ping(b"are you there".to_vec())).await.unwrap();
            ws.send(Message::Binary(b"raw reply".to_vec())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let probe = EchoProbe::new(settings(format!("ws://{addr}/ws"), 0, Some(1)));
        let mut events: Vec<ProbeEvent> = Vec::new();
        assert_ok!(probe.run(&mut events, std::future::pending()).await);

        let (_, received) = sent_and_received(&events);
        assert_eq!(received, vec![(1, "raw reply".to_string())]);
    }
}
