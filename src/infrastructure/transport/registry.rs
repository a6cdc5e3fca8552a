//! Holder for the process-wide transport session handle

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::dispatch::TransportSession;

/// The currently installed transport session, if any
///
/// Pairing and reconnects happen outside this crate; whoever manages the
/// session installs or clears it here.
#[derive(Default)]
pub struct SessionRegistry {
    current: RwLock<Option<Arc<dyn TransportSession>>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let installed = self
            .current
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(true);
        f.debug_struct("SessionRegistry")
            .field("installed", &installed)
            .finish()
    }
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with a session already installed
    pub fn with_session(session: Arc<dyn TransportSession>) -> Self {
        Self {
            current: RwLock::new(Some(session)),
        }
    }

    /// Install (or replace) the session
    pub async fn install(&self, session: Arc<dyn TransportSession>) {
        *self.current.write().await = Some(session);
        info!("Transport session installed");
    }

    /// Remove the session; subsequent dispatches short-circuit
    pub async fn clear(&self) {
        if self.current.write().await.take().is_some() {
            info!("Transport session cleared");
        }
    }

    /// The installed session
    pub async fn current(&self) -> Option<Arc<dyn TransportSession>> {
        self.current.read().await.clone()
    }

    /// True when a session is installed and reports itself connected
    pub async fn is_connected(&self) -> bool {
        match self.current().await {
            Some(session) => session.is_connected().await,
            None => false,
        }
    }
}
