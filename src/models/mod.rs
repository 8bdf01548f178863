//! Data models and types for the application.
//!
//! Contains domain types for:
//! - [`Address`] - Shareable resource addresses and their canonical identity
//! - [`DriveDoc`], [`FileMeta`], [`SharedFolderMeta`] - Converged drive documents
//! - [`OutputLine`] - Terminal output types

mod address;
mod drive;
mod terminal;

pub use address::{Address, channel_identity};
pub use drive::{DriveDoc, FileMeta, SharedFolderMeta, id_key};
pub use terminal::{CLEAR_SCREEN, OutputLine, TextStyle};
