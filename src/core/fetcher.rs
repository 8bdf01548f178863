//! Document content retrieval with convergence detection.
//!
//! A document is read through a short-lived session. Its content is taken as
//! soon as it *settles*: the converged document is non-empty and can be turned
//! into text. Three signals race:
//!
//! 1. the engine's change notification
//! 2. a fallback poll every `poll_interval`
//! 3. a hard `timeout`, after which the read is a soft miss
//!
//! The timeout covers opening the session as well. The session is stopped
//! when the race ends, whichever way it ends, and when the read is dropped.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, timeout_at};

use crate::config::{DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::models::Address;
use crate::sync::{Connector, Session, SessionStatus};

// =============================================================================
// Result Types
// =============================================================================

/// Outcome of a document read.
///
/// `content` is absent when the document never settled; serialized, the
/// `content` key is then omitted entirely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    /// Resolved document address
    pub address: String,
    /// Settled content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Result of racing the settle signals.
#[derive(Debug, PartialEq, Eq)]
pub enum RaceResult {
    /// Content settled.
    Completed(String),
    /// Timeout occurred before the content settled.
    TimedOut,
    /// The session failed.
    Error(String),
}

/// Timing of a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

// =============================================================================
// Fetcher
// =============================================================================

/// Reads single documents through transient sessions.
pub struct ContentFetcher {
    connector: Arc<dyn Connector>,
    options: FetchOptions,
}

impl ContentFetcher {
    pub fn new(connector: Arc<dyn Connector>, options: FetchOptions) -> Self {
        Self { connector, options }
    }

    /// Read the document at `address`.
    ///
    /// Never fails: connection errors and timeouts yield a result without
    /// content.
    pub async fn fetch(&self, address: &Address) -> ReadResult {
        let mut result = ReadResult {
            address: address.to_string(),
            content: None,
        };
        let deadline = Instant::now() + self.options.timeout;

        let opened = timeout_at(deadline, Session::open(self.connector.as_ref(), address)).await;
        let session = match opened {
            Ok(Ok(session)) => StopOnDrop(session),
            Ok(Err(e)) => {
                warn!("cannot open {}: {}", address, e);
                return result;
            }
            Err(_) => {
                info!("{} did not open within {:?}", address, self.options.timeout);
                return result;
            }
        };

        let remaining = FetchOptions {
            timeout: deadline.saturating_duration_since(Instant::now()),
            ..self.options
        };
        match race_settle(&session.0, remaining).await {
            RaceResult::Completed(content) => {
                debug!("{} settled ({} bytes)", address, content.len());
                result.content = Some(content);
            }
            RaceResult::TimedOut => {
                info!("{} did not settle within {:?}", address, self.options.timeout);
            }
            RaceResult::Error(reason) => {
                warn!("{} failed: {}", address, reason);
            }
        }

        result
    }
}

/// Stops the wrapped session when dropped, including on cancellation.
struct StopOnDrop(Session);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Shortest fallback poll period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Race change notifications, polling and the timeout until content settles.
pub async fn race_settle(session: &Session, options: FetchOptions) -> RaceResult {
    let mut changes = session.changes();
    let mut status = session.status_updates();
    let period = options.poll_interval.max(MIN_POLL_INTERVAL);
    let mut poll = interval_at(Instant::now() + period, period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut deadline = pin!(sleep(options.timeout));

    let mut notifications = true;
    let mut watching_status = true;

    // Engines that answer from a local cache are ready before we subscribe.
    if let Some(content) = try_settle(session) {
        return RaceResult::Completed(content);
    }

    loop {
        tokio::select! {
            _ = &mut deadline => return RaceResult::TimedOut,
            changed = changes.changed(), if notifications => {
                if changed.is_err() {
                    notifications = false;
                } else if let Some(content) = try_settle(session) {
                    return RaceResult::Completed(content);
                }
            }
            failed = status.wait_for(|s| matches!(s, SessionStatus::Failed(_))), if watching_status => {
                match failed {
                    Ok(s) => {
                        let reason = match &*s {
                            SessionStatus::Failed(reason) => reason.clone(),
                            _ => String::new(),
                        };
                        return RaceResult::Error(reason);
                    }
                    Err(_) => watching_status = false,
                }
            }
            _ = poll.tick() => {
                if let Some(content) = try_settle(session) {
                    return RaceResult::Completed(content);
                }
            }
        }
    }
}

/// Content of the session's document, if it has settled.
fn try_settle(session: &Session) -> Option<String> {
    let document = session.document()?;
    match extract_content(&document) {
        Ok(content) => content,
        Err(reason) => {
            warn!("unreadable document {}: {}", session.address(), reason);
            Some(unreadable(&reason))
        }
    }
}

/// Sentinel content for documents that cannot be parsed.
pub fn unreadable(reason: &str) -> String {
    format!("[unreadable document: {}]", reason)
}

// =============================================================================
// Content Extraction
// =============================================================================

/// Turn a converged document into text.
///
/// - `Ok(None)`: nothing usable yet (empty, or no content field)
/// - `Ok(Some(text))`: settled content
/// - `Err(reason)`: the document is malformed
///
/// Raw string documents are parsed as JSON first. Parsed documents are either
/// `{"content": "..."}` or a hyperjson tree (`["TAG", {attrs}, [children]]`)
/// whose text nodes are concatenated.
pub fn extract_content(document: &Value) -> Result<Option<String>, String> {
    match document {
        Value::String(raw) => {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            let parsed: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
            if parsed.is_string() {
                return Err("expected a document model, found a bare string".to_string());
            }
            extract_content(&parsed)
        }
        Value::Null => Ok(None),
        Value::Object(map) => match map.get("content") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(non_empty(s.clone())),
            Some(tree @ Value::Array(_)) => Ok(non_empty(hyperjson_text(tree))),
            Some(other) => Ok(non_empty(other.to_string())),
        },
        Value::Array(_) => Ok(non_empty(hyperjson_text(document))),
        other => Err(format!("unsupported document model: {}", other)),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

const BLOCK_TAGS: &[&str] = &[
    "P", "DIV", "LI", "TR", "H1", "H2", "H3", "H4", "H5", "H6", "PRE", "BLOCKQUOTE", "TABLE",
];

/// Plain text of a hyperjson tree.
fn hyperjson_text(tree: &Value) -> String {
    let mut out = String::new();
    collect_text(tree, &mut out);
    out.trim_end().to_string()
}

fn collect_text(node: &Value, out: &mut String) {
    match node {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            let tag = items
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_ascii_uppercase();
            if tag == "BR" {
                out.push('\n');
                return;
            }
            if let Some(Value::Array(children)) = items.get(2) {
                for child in children {
                    collect_text(child, out);
                }
            }
            if BLOCK_TAGS.contains(&tag.as_str()) && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => {}
    }
}
