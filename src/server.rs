//! TCP server for the local echo endpoint.
//!
//! Accepts connections under a connection limit and hands each one to the
//! echo handler on its own task.

use crate::config::ServerSettings;
use crate::protocols::echo;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Echo server instance
pub struct Server {
    listen: String,
    connection_limit: Arc<Semaphore>,
    echoed: Arc<AtomicU64>,
}

impl Server {
    /// Create a new server instance
    pub fn new(settings: &ServerSettings) -> Self {
        Server {
            listen: settings.listen.clone(),
            connection_limit: Arc::new(Semaphore::new(settings.max_connections)),
            echoed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        let listener = TcpListener::bind(&self.listen).await?;
        info!(address = %listener.local_addr()?, "Server listening");
        Ok(listener)
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// Connections already being served keep running on their own tasks.
    pub async fn serve<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            // Wait for a connection slot
            let permit = tokio::select! {
                permit = self.connection_limit.clone().acquire_owned() => permit?,
                _ = &mut shutdown => break,
            };

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut shutdown => break,
            };

            match accepted {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let echoed = Arc::clone(&self.echoed);

                    tokio::spawn(async move {
                        if let Err(e) = echo::handle_connection(stream, echoed).await {
                            debug!(peer = %addr, error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }

        info!(
            echoed = self.echoed.load(Ordering::Relaxed),
            "Server stopped"
        );
        Ok(())
    }

    /// Total frames echoed across all connections
    #[cfg(test)]
    pub fn echoed(&self) -> u64 {
        self.echoed.load(Ordering::Relaxed)
    }
}
