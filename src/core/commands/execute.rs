//! Command execution logic.
//!
//! Runs parsed commands against the drive. Every failure becomes an error
//! line; the shell keeps reading after it.

use crate::config::HELP_TEXT;
use crate::core::DriveFs;
use crate::core::error::FsError;
use crate::models::OutputLine;

use super::{Command, CommandResult, PathArg};

/// Execute a parsed command and return output lines.
///
/// # Arguments
///
/// * `cmd` - The parsed command to execute
/// * `fs` - Drive filesystem
/// * `cwd` - Shell working directory token, updated by `cd`
/// * `progress` - Receives progress lines of long running commands
pub async fn execute_command(
    cmd: Command,
    fs: &mut DriveFs,
    cwd: &mut String,
    progress: &mut dyn FnMut(&str),
) -> CommandResult {
    let result = match cmd {
        Command::Help => Ok(CommandResult::output(
            HELP_TEXT.lines().map(OutputLine::text).collect(),
        )),
        Command::Pwd => Ok(CommandResult::output(vec![OutputLine::text(fs.get_path())])),
        Command::Ls(path) => execute_ls(path, fs, cwd),
        Command::Info(name) => execute_info(name, fs, cwd),
        Command::Cd(path) => execute_cd(path, fs, cwd).await,
        Command::Cat(name) => execute_cat(name, fs, cwd, progress).await,
        Command::Clear => Ok(CommandResult::output(vec![OutputLine::Clear])),
        Command::Exit => Ok(CommandResult::exit()),
        Command::Usage(usage) => Err(FsError::Usage(usage)),
        Command::Unknown(name) => Ok(CommandResult::error(format!(
            "Unknown command: {}. Type 'help'",
            name
        ))),
    };

    result.unwrap_or_else(|e| CommandResult::error(e.to_string()))
}

/// Execute `ls` command.
fn execute_ls(path: Option<PathArg>, fs: &DriveFs, cwd: &str) -> Result<CommandResult, FsError> {
    let target = DriveFs::join(cwd, path.as_ref().map_or(".", PathArg::as_str));
    let entries = fs.list_display(&target)?;
    if entries.is_empty() {
        return Ok(CommandResult::empty());
    }

    let mut output = vec![OutputLine::Empty];
    output.extend(entries);
    Ok(CommandResult::output(output))
}

/// Execute `info` command.
fn execute_info(name: PathArg, fs: &DriveFs, cwd: &str) -> Result<CommandResult, FsError> {
    let data = fs.info(cwd, name.as_str())?;
    let text = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
    Ok(CommandResult::output(
        text.lines().map(OutputLine::text).collect(),
    ))
}

/// Execute `cd` command.
async fn execute_cd(
    path: PathArg,
    fs: &mut DriveFs,
    cwd: &mut String,
) -> Result<CommandResult, FsError> {
    let moved = fs.change_dir(cwd, path.as_str()).await?;
    *cwd = moved.path;
    Ok(CommandResult::output(
        moved.message.lines().map(OutputLine::text).collect(),
    ))
}

/// Execute `cat` command.
async fn execute_cat(
    name: PathArg,
    fs: &DriveFs,
    cwd: &str,
    progress: &mut dyn FnMut(&str),
) -> Result<CommandResult, FsError> {
    let read = fs.cat(cwd, name.as_str(), Some(progress)).await?;
    match read.content {
        Some(content) => Ok(CommandResult::output(
            content.lines().map(OutputLine::text).collect(),
        )),
        None => Ok(CommandResult::error(format!(
            "cat: {}: no content received from {}",
            name, read.address
        ))),
    }
}
