//! Session registry.
//!
//! Holds every open shopping session in memory, keyed by session id. All
//! sessions share one ledger connection but own their cart and catalog.

use std::collections::HashMap;
use std::sync::Arc;

use stockwise_exec::{ExecConfig, Session};
use stockwise_store::InventoryLedger;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{DaemonError, DaemonResult};

/// A session over whatever ledger the daemon was started with.
pub type SharedSession = Arc<Session<dyn InventoryLedger>>;

/// In-memory table of open sessions.
pub struct SessionRegistry {
    ledger: Arc<dyn InventoryLedger>,
    config: ExecConfig,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(ledger: Arc<dyn InventoryLedger>, config: ExecConfig) -> Self {
        Self {
            ledger,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The shared ledger.
    pub fn ledger(&self) -> &Arc<dyn InventoryLedger> {
        &self.ledger
    }

    /// Open a session and load its first catalog.
    pub async fn open(&self) -> SharedSession {
        let session = Arc::new(Session::open(self.ledger.clone(), self.config.clone()).await);

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id(), session.clone());
        info!(session_id = %session.id(), open_sessions = sessions.len(), "Session registered");

        session
    }

    /// Look up an open session.
    pub async fn get(&self, session_id: Uuid) -> DaemonResult<SharedSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(DaemonError::SessionNotFound(session_id))
    }

    /// Drop a session. Its cart is discarded; nothing is written to the ledger.
    pub async fn close(&self, session_id: Uuid) -> DaemonResult<()> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|_| ())
            .ok_or(DaemonError::SessionNotFound(session_id))
    }

    /// Number of open sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
