//! Shared server state and the accept loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};

use duet_pairing::{ConnectionRegistry, PairingConfig, PairingRegistry, RelayRouter};

use crate::auth::IdentityGate;
use crate::connection::handle_connection;

/// Tunables for one relay instance.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub pairing: PairingConfig,
    /// How long a fresh socket may take to send its hello.
    pub handshake_timeout: Duration,
    /// Inactivity (either direction) after which a connection is closed.
    pub idle_timeout: Duration,
    /// How often the expiry reaper runs.
    pub reaper_interval: Duration,
    /// Per-connection outbound channel capacity; overflow is dropped.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pairing: PairingConfig::default(),
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            reaper_interval: Duration::from_secs(60),
            outbound_buffer: 256,
        }
    }
}

/// Everything a connection task needs, behind one `Arc`. Registries are
/// injected here rather than living as globals, so tests can stand up a
/// whole relay on a loopback listener.
pub struct RelayState {
    pub pairings: Arc<PairingRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub router: RelayRouter,
    pub gate: Arc<dyn IdentityGate>,
    pub config: RelayConfig,
}

impl RelayState {
    pub fn new(gate: Arc<dyn IdentityGate>, config: RelayConfig) -> Arc<Self> {
        let pairings = Arc::new(PairingRegistry::new(config.pairing.clone()));
        let connections = Arc::new(ConnectionRegistry::new(Arc::clone(&pairings)));
        let router = RelayRouter::new(Arc::clone(&connections));
        Arc::new(Self {
            pairings,
            connections,
            router,
            gate,
            config,
        })
    }
}

/// Accept connections until the listener dies. One task per socket; a
/// failed handshake or a dead connection never affects the others.
pub async fn run(listener: TcpListener, state: Arc<RelayState>) {
    // Expiry reaper. Hygiene only: every read path re-checks TTLs itself.
    let reaper = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(reaper.config.reaper_interval).await;
            let swept = reaper.pairings.sweep_expired().await;
            let sessions = reaper.pairings.len().await;
            let connections = reaper.connections.len().await;
            debug!(
                swept,
                sessions,
                connections,
                "reaper tick"
            );
        }
    });

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, state).await,
                        Err(e) => {
                            warn!(peer = %addr, error = %e, "websocket handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "tcp accept error");
            }
        }
    }
}

/// Bind and serve. Split from [`run`] so callers (and the integration
/// tests) can learn the bound address before the loop starts.
pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "duet-relay listening");
    Ok(listener)
}
