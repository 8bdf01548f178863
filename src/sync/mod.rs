//! Seam to the realtime synchronization engine.
//!
//! The engine itself (transport, decryption, merge) lives outside this crate.
//! It is consumed through two traits:
//!
//! - [`Connector`] opens a [`Channel`] for an [`Address`]
//! - [`Channel`] reports readiness, signals content changes, and exposes the
//!   converged document
//!
//! [`Session`] wraps a channel with the address it was opened for and turns
//! the raw status stream into an awaitable readiness result.

mod memory;
mod registry;

pub use memory::MemoryConnector;
pub use registry::{HOME_SLOT, SessionRegistry};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::core::error::SessionError;
use crate::models::Address;

/// Connection state of a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Joined, waiting for history to converge
    Connecting,
    /// Converged; the document can be read
    Ready,
    /// The engine gave up
    Failed(String),
}

/// One open channel of the synchronization engine.
pub trait Channel: Send + Sync {
    /// Status updates, starting with the current status.
    fn status(&self) -> watch::Receiver<SessionStatus>;

    /// Change counter, bumped whenever the engine reports new content.
    fn changes(&self) -> watch::Receiver<u64>;

    /// Current converged document, if any content has arrived.
    fn document(&self) -> Option<Arc<Value>>;

    /// Release sockets and timers held for this channel.
    fn stop(&self);
}

/// Opens channels on the synchronization engine.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a channel for `address`.
    ///
    /// Returns as soon as the channel exists; readiness is reported through
    /// [`Channel::status`].
    async fn open(&self, address: &Address) -> Result<Arc<dyn Channel>, SessionError>;
}

/// A channel bound to the address it was opened for.
#[derive(Clone)]
pub struct Session {
    address: Address,
    channel: Arc<dyn Channel>,
}

impl Session {
    /// Open a session through `connector`.
    pub async fn open(connector: &dyn Connector, address: &Address) -> Result<Self, SessionError> {
        let channel = connector.open(address).await?;
        Ok(Self {
            address: address.clone(),
            channel,
        })
    }

    /// Address this session was opened for.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.channel.status().borrow().clone()
    }

    /// Status stream.
    pub fn status_updates(&self) -> watch::Receiver<SessionStatus> {
        self.channel.status()
    }

    /// Change notifications.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.channel.changes()
    }

    /// Current converged document.
    pub fn document(&self) -> Option<Arc<Value>> {
        self.channel.document()
    }

    /// Wait until the session leaves `Connecting`.
    pub async fn ready(&self) -> Result<(), SessionError> {
        let mut rx = self.channel.status();
        let status = rx
            .wait_for(|s| *s != SessionStatus::Connecting)
            .await
            .map_err(|_| SessionError::Closed)?
            .clone();

        match status {
            SessionStatus::Ready => Ok(()),
            SessionStatus::Failed(reason) => Err(SessionError::Failed {
                address: self.address.to_string(),
                reason,
            }),
            SessionStatus::Connecting => Err(SessionError::Closed),
        }
    }

    /// Stop the underlying channel.
    pub fn stop(&self) {
        self.channel.stop();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address.as_str())
            .field("status", &self.status())
            .finish()
    }
}
