//! Single-slot session management.
//!
//! At most one live session exists at a time. Acquiring with the fingerprint
//! of the current session reuses it; anything else closes it and opens a new
//! one. A session's connect runs once and is shared by every caller that
//! acquires while it is in flight.

use crate::client::McpClient;
use crate::endpoint::{Endpoint, SessionFingerprint};
use crate::error::{McpError, McpResult};
use crate::negotiate::TransportMode;
use crate::transport::{Transport, TransportFactory};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Upper bound on each half of a session close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type SharedConnect = Shared<BoxFuture<'static, Result<Arc<McpClient>, Arc<McpError>>>>;

struct Session {
    generation: u64,
    fingerprint: SessionFingerprint,
    transport: Arc<dyn Transport>,
    client: Arc<McpClient>,
    connect: SharedConnect,
}

impl Session {
    fn open(
        generation: u64,
        fingerprint: SessionFingerprint,
        factory: &dyn TransportFactory,
        endpoint: &Endpoint,
    ) -> McpResult<Self> {
        let transport = factory.create(fingerprint.mode(), endpoint)?;
        let client = Arc::new(McpClient::new(transport.clone()));

        let connecting = client.clone();
        let connect = async move {
            connecting.connect().await.map_err(Arc::new)?;
            if let Some(init) = connecting.server_info() {
                debug!(
                    server = %init.server_info.name,
                    protocol_version = %init.protocol_version,
                    "MCP session ready"
                );
            }
            Ok::<_, Arc<McpError>>(connecting)
        }
        .boxed()
        .shared();

        Ok(Self {
            generation,
            fingerprint,
            transport,
            client,
            connect,
        })
    }

    fn is_reusable(&self, fingerprint: &SessionFingerprint) -> bool {
        self.fingerprint == *fingerprint && !self.transport.is_dead() && !self.client.is_closed()
    }

    /// Close the client and then the transport. Failures are logged and dropped;
    /// the transport close runs even when the client close fails.
    async fn close_quietly(self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Ignoring MCP client close failure"),
            Err(_) => debug!("MCP client close timed out"),
        }
        match tokio::time::timeout(CLOSE_TIMEOUT, self.transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Ignoring MCP transport close failure"),
            Err(_) => debug!("MCP transport close timed out"),
        }
    }
}

/// Owns the one live MCP session.
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    slot: Mutex<Option<Session>>,
    generation: AtomicU64,
}

impl SessionManager {
    /// Create an empty manager building transports with `factory`.
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Get a connected client for `endpoint` over `mode`.
    ///
    /// Concurrent callers with the same fingerprint receive the same client
    /// and share one connect. If the connect fails the session is discarded,
    /// unless a newer one has already replaced it.
    pub async fn acquire(&self, endpoint: &Endpoint, mode: TransportMode) -> McpResult<Arc<McpClient>> {
        let fingerprint = SessionFingerprint::new(mode, endpoint);

        let (generation, connect) = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(session) if session.is_reusable(&fingerprint) => {
                    debug!(generation = session.generation, "Reusing MCP session");
                    (session.generation, session.connect.clone())
                }
                _ => {
                    if let Some(stale) = slot.take() {
                        debug!(
                            generation = stale.generation,
                            url = %stale.fingerprint.url(),
                            "Replacing MCP session"
                        );
                        stale.close_quietly().await;
                    }

                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let session =
                        Session::open(generation, fingerprint, self.factory.as_ref(), endpoint)
                            .map_err(|e| McpError::ConnectFailed(Arc::new(e)))?;

                    info!(
                        generation,
                        url = %session.fingerprint.url(),
                        transport = %session.fingerprint.mode(),
                        "Opening MCP session"
                    );

                    let connect = session.connect.clone();
                    *slot = Some(session);
                    (generation, connect)
                }
            }
        };

        match connect.await {
            Ok(client) => Ok(client),
            Err(e) => {
                self.discard(generation).await;
                Err(McpError::ConnectFailed(e))
            }
        }
    }

    /// Drop the session with `generation` if it still holds the slot.
    async fn discard(&self, generation: u64) {
        let failed = {
            let mut slot = self.slot.lock().await;
            if slot.as_ref().is_some_and(|s| s.generation == generation) {
                slot.take()
            } else {
                None
            }
        };

        if let Some(session) = failed {
            debug!(generation, "Discarding MCP session after failed connect");
            session.close_quietly().await;
        }
    }

    /// Close the current session, if any. Safe to call repeatedly.
    pub async fn close(&self) {
        let current = self.slot.lock().await.take();
        if let Some(session) = current {
            debug!(generation = session.generation, "Closing MCP session");
            session.close_quietly().await;
        }
    }

    /// Fingerprint of the session holding the slot.
    pub async fn current(&self) -> Option<SessionFingerprint> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|session| session.fingerprint.clone())
    }
}
