//! Registry of connected sessions.
//!
//! Keeps at most one session per canonical address so that returning to a
//! shared folder reuses its connection. Slot 0 is the home drive; it is
//! registered first and never replaced.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::timeout;

use super::{Connector, Session, SessionStatus};
use crate::core::error::SessionError;
use crate::models::Address;

/// Slot of the home drive.
pub const HOME_SLOT: usize = 0;

/// Sessions keyed by canonical address, in registration order.
pub struct SessionRegistry {
    connector: Arc<dyn Connector>,
    /// All registered sessions; index is the slot number
    sessions: Vec<Session>,
    /// Canonical address to slot
    slots: HashMap<String, usize>,
    connect_timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry and open the home drive session in slot 0.
    pub async fn with_home(
        connector: Arc<dyn Connector>,
        home: &Address,
        connect_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let session = open_within(connector.as_ref(), home, connect_timeout).await?;
        info!("connecting to home drive {}", home);

        let mut slots = HashMap::new();
        slots.insert(home.canonical().to_string(), HOME_SLOT);
        Ok(Self {
            connector,
            sessions: vec![session],
            slots,
            connect_timeout,
        })
    }

    /// The home drive session.
    pub fn home(&self) -> &Session {
        &self.sessions[HOME_SLOT]
    }

    /// Session in `slot`.
    pub fn get(&self, slot: usize) -> Option<&Session> {
        self.sessions.get(slot)
    }

    /// Slot of an already registered address.
    pub fn lookup(&self, address: &Address) -> Option<usize> {
        self.slots.get(address.canonical()).copied()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always false: the home drive is registered on construction.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Return the slot for `address`, opening a session if needed.
    ///
    /// The returned session may still be connecting; use [`Self::await_ready`].
    /// A cached session that failed is reopened in place, except the home
    /// drive which keeps its slot and state.
    pub async fn get_or_connect(&mut self, address: &Address) -> Result<usize, SessionError> {
        if let Some(slot) = self.lookup(address) {
            let failed = matches!(self.sessions[slot].status(), SessionStatus::Failed(_));
            if !failed || slot == HOME_SLOT {
                debug!("session cache hit for {} (slot {})", address, slot);
                return Ok(slot);
            }
            info!("reconnecting failed session {}", address);
            self.sessions[slot].stop();
            self.sessions[slot] = self.open(address).await?;
            return Ok(slot);
        }

        let session = self.open(address).await?;
        let slot = self.sessions.len();
        self.sessions.push(session);
        self.slots.insert(address.canonical().to_string(), slot);
        info!("connecting to {} (slot {})", address, slot);
        Ok(slot)
    }

    async fn open(&self, address: &Address) -> Result<Session, SessionError> {
        open_within(self.connector.as_ref(), address, self.connect_timeout).await
    }

    /// Wait for the session in `slot` to become ready.
    ///
    /// Bounded by the configured connect timeout.
    pub async fn await_ready(&self, slot: usize) -> Result<(), SessionError> {
        let Some(session) = self.sessions.get(slot) else {
            return Err(SessionError::Closed);
        };
        match timeout(self.connect_timeout, session.ready()).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::ConnectTimeout {
                address: session.address().to_string(),
            }),
        }
    }
}

/// Open a session, giving up after `limit`.
async fn open_within(
    connector: &dyn Connector,
    address: &Address,
    limit: Duration,
) -> Result<Session, SessionError> {
    match timeout(limit, Session::open(connector, address)).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::ConnectTimeout {
            address: address.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MemoryConnector;
    use serde_json::json;

    const HOME: &str = "http://h/drive/#/2/drive/edit/AAAAAAAAAAAAAAAAAAAAAAAA/";
    const TEAM: &str = "http://h/drive/#/2/drive/edit/BBBBBBBBBBBBBBBBBBBBBBBB/";

    async fn registry(connector: Arc<MemoryConnector>) -> SessionRegistry {
        SessionRegistry::with_home(connector, &Address::parse(HOME), Duration::from_secs(30))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_home_is_slot_zero() {
        let connector = Arc::new(MemoryConnector::new());
        let reg = registry(connector).await;
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.home().address(), &Address::parse(HOME));
        assert_eq!(reg.lookup(&Address::parse(HOME)), Some(HOME_SLOT));
    }

    #[tokio::test]
    async fn test_get_or_connect_reuses_canonical_address() {
        let connector = Arc::new(MemoryConnector::new().with_document(TEAM, json!({ "root": {} })));
        let mut reg = registry(connector.clone()).await;

        let a = reg.get_or_connect(&Address::parse(TEAM)).await.unwrap();
        reg.await_ready(a).await.unwrap();
        let b = reg
            .get_or_connect(&Address::parse(TEAM.trim_end_matches('/')))
            .await
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(reg.len(), 2);
        assert_eq!(connector.stats(TEAM).opened, 1);
    }

    #[tokio::test]
    async fn test_failed_session_is_reopened() {
        let connector = Arc::new(MemoryConnector::new().with_failure(TEAM, "denied"));
        let mut reg = registry(connector.clone()).await;

        let slot = reg.get_or_connect(&Address::parse(TEAM)).await.unwrap();
        assert!(reg.await_ready(slot).await.is_err());

        let again = reg.get_or_connect(&Address::parse(TEAM)).await.unwrap();
        assert_eq!(slot, again);
        assert_eq!(connector.stats(TEAM).opened, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_times_out() {
        let connector = Arc::new(
            MemoryConnector::new().with_ready_delay(TEAM, Duration::from_secs(120)),
        );
        let mut reg = registry(connector).await;
        let slot = reg.get_or_connect(&Address::parse(TEAM)).await.unwrap();
        let err = reg.await_ready(slot).await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_open_times_out() {
        let connector = Arc::new(
            MemoryConnector::new().with_open_delay(TEAM, Duration::from_secs(120)),
        );
        let mut reg = registry(connector.clone()).await;

        let err = reg.get_or_connect(&Address::parse(TEAM)).await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectTimeout { .. }));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup(&Address::parse(TEAM)), None);

        let home = SessionRegistry::with_home(
            Arc::new(MemoryConnector::new().with_open_delay(HOME, Duration::from_secs(120))),
            &Address::parse(HOME),
            Duration::from_secs(30),
        )
        .await;
        assert!(matches!(home, Err(SessionError::ConnectTimeout { .. })));
    }
}
