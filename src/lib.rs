//! Browse a collaborative, realtime-synchronized drive as a filesystem.
//!
//! The drive is a JSON document converged by an external synchronization
//! engine, reached through the [`sync::Connector`] seam. [`core::DriveFs`]
//! turns it into folders, documents and shared-folder mounts that the
//! [`shell`] navigates with `ls`, `cd`, `info` and `cat`.

pub mod config;
pub mod core;
pub mod models;
pub mod shell;
pub mod sync;
