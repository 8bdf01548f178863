//! In-process synchronization engine.
//!
//! Serves documents from memory, optionally loaded from a JSON snapshot file:
//!
//! ```json
//! { "documents": { "<address>": <document>, ... } }
//! ```
//!
//! Each address can be scripted with an open or readiness delay, a failure, or later
//! content updates (announced or silent), which is enough to exercise every
//! convergence path of the engine without a server.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};

use super::{Channel, Connector, SessionStatus};
use crate::core::error::{ConfigError, SessionError};
use crate::models::Address;

/// A content change applied some time after the channel opened.
#[derive(Clone, Debug)]
struct Update {
    after: Duration,
    value: Value,
    notify: bool,
}

/// Scripted behavior for one address.
#[derive(Clone, Debug, Default)]
struct Script {
    document: Option<Value>,
    open_after: Duration,
    ready_after: Duration,
    failure: Option<String>,
    updates: Vec<Update>,
}

/// Open/stop counters for one address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub opened: usize,
    pub stopped: usize,
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    documents: serde_json::Map<String, Value>,
}

/// Connector backed by in-memory documents.
#[derive(Default)]
pub struct MemoryConnector {
    scripts: Mutex<HashMap<String, Script>>,
    stats: Arc<Mutex<HashMap<String, ChannelStats>>>,
}

impl MemoryConnector {
    /// Create an empty connector. Unknown addresses connect to empty channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load documents from a snapshot file.
    pub fn from_snapshot(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&text).map_err(|source| ConfigError::Snapshot {
                path: display,
                source,
            })?;

        let mut connector = Self::new();
        for (address, document) in snapshot.documents {
            connector = connector.with_document(&address, document);
        }
        Ok(connector)
    }

    /// Serve `document` for `address` once the channel is ready.
    pub fn with_document(self, address: &str, document: Value) -> Self {
        self.script(address, |s| s.document = Some(document))
    }

    /// Stall opening a channel for `address`, as a slow handshake would.
    pub fn with_open_delay(self, address: &str, delay: Duration) -> Self {
        self.script(address, |s| s.open_after = delay)
    }

    /// Delay readiness of `address`.
    pub fn with_ready_delay(self, address: &str, delay: Duration) -> Self {
        self.script(address, |s| s.ready_after = delay)
    }

    /// Make `address` fail instead of becoming ready.
    pub fn with_failure(self, address: &str, reason: &str) -> Self {
        let reason = reason.to_string();
        self.script(address, |s| s.failure = Some(reason))
    }

    /// Replace the document of `address` at `after` since the channel opened.
    ///
    /// Silent updates (`notify == false`) change the document without a
    /// change notification.
    pub fn with_update(self, address: &str, after: Duration, value: Value, notify: bool) -> Self {
        self.script(address, |s| {
            s.updates.push(Update {
                after,
                value,
                notify,
            });
            s.updates.sort_by_key(|u| u.after);
        })
    }

    /// Open/stop counters for `address`.
    pub fn stats(&self, address: &str) -> ChannelStats {
        let key = Address::parse(address).canonical().to_string();
        lock(&self.stats).get(&key).copied().unwrap_or_default()
    }

    fn script(self, address: &str, f: impl FnOnce(&mut Script)) -> Self {
        let key = Address::parse(address).canonical().to_string();
        f(lock(&self.scripts).entry(key).or_default());
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, address: &Address) -> Result<Arc<dyn Channel>, SessionError> {
        let key = address.canonical().to_string();
        let script = lock(&self.scripts).get(&key).cloned().unwrap_or_default();
        sleep(script.open_after).await;
        lock(&self.stats).entry(key.clone()).or_default().opened += 1;
        debug!("memory engine: opening channel {}", key);

        let shared = Arc::new(Shared {
            status: watch::Sender::new(SessionStatus::Connecting),
            changes: watch::Sender::new(0),
            document: Mutex::new(None),
        });
        let task = tokio::spawn(run_script(shared.clone(), script));

        Ok(Arc::new(MemoryChannel {
            key,
            shared,
            task: Mutex::new(Some(task)),
            stats: self.stats.clone(),
        }))
    }
}

/// State shared between a channel and its script task.
struct Shared {
    status: watch::Sender<SessionStatus>,
    changes: watch::Sender<u64>,
    document: Mutex<Option<Arc<Value>>>,
}

impl Shared {
    fn set_document(&self, value: Value, notify: bool) {
        *lock(&self.document) = Some(Arc::new(value));
        if notify {
            self.changes.send_modify(|n| *n += 1);
        }
    }
}

async fn run_script(shared: Arc<Shared>, script: Script) {
    let opened = Instant::now();
    sleep(script.ready_after).await;

    if let Some(reason) = script.failure {
        shared.status.send_replace(SessionStatus::Failed(reason));
        return;
    }
    if let Some(document) = script.document {
        shared.set_document(document, false);
    }
    shared.status.send_replace(SessionStatus::Ready);
    shared.changes.send_modify(|n| *n += 1);

    for update in script.updates {
        sleep_until(opened + update.after).await;
        shared.set_document(update.value, update.notify);
    }
}

struct MemoryChannel {
    key: String,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<HashMap<String, ChannelStats>>>,
}

impl Channel for MemoryChannel {
    fn status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    fn document(&self) -> Option<Arc<Value>> {
        lock(&self.shared.document).clone()
    }

    fn stop(&self) {
        let Some(task) = lock(&self.task).take() else {
            return;
        };
        task.abort();
        self.shared.status.send_if_modified(|s| {
            if *s == SessionStatus::Connecting {
                *s = SessionStatus::Failed("stopped".to_string());
                true
            } else {
                false
            }
        });
        lock(&self.stats).entry(self.key.clone()).or_default().stopped += 1;
        debug!("memory engine: stopped channel {}", self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
