//! Relay HTTP server.
//!
//! Binds the loopback listener and serves the router until stopped. A failed
//! bind leaves nothing running.

use crate::adapters::KillPortReleaser;
use crate::domain::config::RelayConfig;
use crate::domain::error::{RelayError, RelayResult};
use crate::ports::PortReleaser;
use crate::router::build_router;
use crate::session::RelaySession;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Pause between freeing a port and binding it again.
const REBIND_DELAY: Duration = Duration::from_millis(250);

/// Running relay server.
pub struct RelayService {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl RelayService {
    /// Bind and start serving `session`.
    pub async fn start(config: &RelayConfig, session: Arc<RelaySession>) -> RelayResult<Self> {
        Self::start_with(config, session, &KillPortReleaser).await
    }

    /// Like [`start`](Self::start) with a custom port releaser.
    pub async fn start_with(
        config: &RelayConfig,
        session: Arc<RelaySession>,
        releaser: &dyn PortReleaser,
    ) -> RelayResult<Self> {
        config
            .validate()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        let listener = bind(config, releaser).await?;
        let local_addr = listener.local_addr().map_err(|e| RelayError::Bind {
            addr: config.bind_addr().to_string(),
            reason: e.to_string(),
        })?;

        let router = build_router(session, &config.cors);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "Relay server error");
            }
        });

        info!(addr = %local_addr, port = local_addr.port(), "Relay server listening");

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
            shutdown_grace: config.shutdown_grace,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// URL of the signer page.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    /// Stop accepting connections and wait for the server task.
    ///
    /// Open connections get `shutdown_grace` to drain before the task is
    /// aborted.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(self.shutdown_grace, &mut server)
                .await
                .is_err()
            {
                warn!(
                    grace_ms = self.shutdown_grace.as_millis(),
                    "Server did not drain in time, aborting"
                );
                server.abort();
            }
        }
        info!(addr = %self.local_addr, "Relay server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.server.as_ref().is_some_and(|s| !s.is_finished())
    }
}

impl Drop for RelayService {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn bind(config: &RelayConfig, releaser: &dyn PortReleaser) -> RelayResult<TcpListener> {
    let addr = config.bind_addr();
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            if !config.free_port || config.port == 0 {
                return Err(RelayError::PortInUse { port: config.port });
            }
            warn!(port = config.port, "Port in use, freeing it and retrying once");
            releaser.release(config.port).await?;
            tokio::time::sleep(REBIND_DELAY).await;
            TcpListener::bind(addr).await.map_err(|e| match e.kind() {
                ErrorKind::AddrInUse => RelayError::PortInUse { port: config.port },
                _ => bind_error(addr, &e),
            })
        }
        Err(e) => Err(bind_error(addr, &e)),
    }
}

fn bind_error(addr: SocketAddr, e: &std::io::Error) -> RelayError {
    RelayError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReleaser {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PortReleaser for CountingReleaser {
        async fn release(&self, _port: u16) -> RelayResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    fn config(port: u16, free_port: bool) -> RelayConfig {
        RelayConfig {
            port,
            free_port,
            shutdown_grace: Duration::from_millis(200),
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_ephemeral_port() {
        let config = config(0, false);
        let mut service = RelayService::start(&config, RelaySession::new(&config))
            .await
            .unwrap();
        assert_ne!(service.port(), 0);
        assert!(service.url().starts_with("http://127.0.0.1:"));
        assert!(service.is_running());

        service.stop().await;
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_port_in_use_without_free_port() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let releaser = CountingReleaser::default();
        let config = config(port, false);
        let err = RelayService::start_with(&config, RelaySession::new(&config), &releaser)
            .await
            .err()
            .unwrap();

        assert_eq!(err, RelayError::PortInUse { port });
        assert!(err.to_string().contains(&port.to_string()));
        assert_eq!(releaser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_free_port_retries_once() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let releaser = CountingReleaser::default();
        let config = config(port, true);
        let err = RelayService::start_with(&config, RelaySession::new(&config), &releaser)
            .await
            .err()
            .unwrap();

        // releaser didn't actually free it, so the single retry fails too
        assert_eq!(err, RelayError::PortInUse { port });
        assert_eq!(releaser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = RelayConfig {
            request_timeout: Duration::ZERO,
            ..RelayConfig::default()
        };
        let err = RelayService::start(&config, RelaySession::new(&RelayConfig::default()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::Config(_)));
    }
}
