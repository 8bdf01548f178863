//! Core logic of the drive shell.
//!
//! This module provides:
//! - [`DriveFs`], the filesystem view of a drive, built from [`navigation`],
//!   [`resolver`] and [`fetcher`]
//! - [`Command`] parsing and [`execute_line`] execution
//! - [`autocomplete`] for tab completion

mod autocomplete;
mod commands;
pub mod error;
pub mod fetcher;
mod filesystem;
pub mod navigation;
pub mod parser;
pub mod path;
pub mod resolver;

pub use autocomplete::{AutocompleteResult, autocomplete};
pub use commands::{Command, CommandResult, PathArg, execute_command, execute_line};
pub use error::{FsError, SessionError};
pub use fetcher::ReadResult;
pub use filesystem::{ChangeDir, DriveFs, FileType};
