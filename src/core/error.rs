//! Custom error types for the application.
//!
//! Provides structured error handling with meaningful error messages
//! and proper error categorization for each domain:
//!
//! - [`FsError`] - Drive navigation and lookup errors surfaced to the shell
//! - [`SessionError`] - Connection and synchronization failures from the sync engine
//! - [`ConfigError`] - Configuration file loading errors

use thiserror::Error;

/// Errors raised by drive navigation and lookups.
///
/// Every variant is recoverable: the shell prints it and keeps reading.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FsError {
    /// A name or path segment did not resolve in the current folder.
    #[error("{0}: no such file or folder")]
    PathNotFound(String),
    /// The name resolved to something that is not a document.
    #[error("{0}: not a file")]
    NotAFile(String),
    /// The name cannot be navigated into.
    #[error("{0}: {1}")]
    NotAFolder(String, &'static str),
    /// The document's metadata carries no link to open it with.
    #[error("{0}: document has no link")]
    NoLink(String),
    /// The operation only supports the drive root path.
    #[error("unsupported path '{0}': only the current folder can be addressed")]
    UnsupportedPath(String),
    /// The operation is not available on a read-only drive.
    #[error("{0}: not implemented")]
    NotImplemented(&'static str),
    /// Missing operand.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// The underlying session could not be used.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Sync engine errors for a single session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The engine reported a failure while connecting or syncing.
    #[error("session for {address} failed: {reason}")]
    Failed { address: String, reason: String },
    /// The session did not become ready in time.
    #[error("timed out connecting to {address}")]
    ConnectTimeout { address: String },
    /// The session was stopped before it became ready.
    #[error("session closed")]
    Closed,
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`crate::config::Settings`].
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// A snapshot file is not valid JSON.
    #[error("invalid snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// A setting holds a value the shell cannot run with.
    #[error("invalid config {path}: `{key}` {reason}")]
    Invalid {
        path: String,
        key: &'static str,
        reason: &'static str,
    },
    /// No document source was configured; only snapshots are served.
    #[error("no snapshot configured (use --snapshot); the realtime transport is not built in")]
    NoTransport,
    /// No drive address was configured.
    #[error("no drive address configured (use --drive or the `drive` config key)")]
    MissingDrive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            FsError::PathNotFound("Notes".into()).to_string(),
            "Notes: no such file or folder"
        );
        assert_eq!(
            FsError::NotAFolder("a.txt".into(), "cannot navigate into a file").to_string(),
            "a.txt: cannot navigate into a file"
        );
        let err: FsError = SessionError::ConnectTimeout {
            address: "x".into(),
        }
        .into();
        assert_eq!(err.to_string(), "timed out connecting to x");
    }
}
