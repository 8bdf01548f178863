//! Command parsing and execution.
//!
//! This module provides:
//! - `Command` enum for parsed shell commands
//! - `CommandResult` for command execution results
//! - `execute_line` for running one line of input against a [`DriveFs`]

mod execute;
mod result;

pub use execute::execute_command;
pub use result::CommandResult;

use std::fmt;

use crate::core::DriveFs;
use crate::core::parser::parse_input;

// =============================================================================
// Path Argument Type
// =============================================================================

/// A path or name argument passed to a command (e.g., `cd Notes`,
/// `cat "Team notes"`).
///
/// Stored as typed; resolution happens against the drive at execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathArg(String);

impl PathArg {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PathArg {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Command Enum
// =============================================================================

/// Parsed shell command
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help,
    Pwd,
    Ls(Option<PathArg>),
    Info(PathArg),
    Cd(PathArg),
    Cat(PathArg),
    Clear,
    Exit,
    /// A command missing its operand; holds the usage line
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    /// All command names, for completion.
    pub fn names() -> &'static [&'static str] {
        &["cat", "cd", "clear", "exit", "help", "info", "ls", "pwd"]
    }

    /// Parse command from name and arguments.
    pub fn parse(name: &str, args: &[String]) -> Self {
        let first = args.first().map(PathArg::new);
        match name.to_lowercase().as_str() {
            "help" => Self::Help,
            "pwd" => Self::Pwd,
            "ls" => Self::Ls(first),
            "info" => first.map_or(Self::Usage("info <name>"), Self::Info),
            "cd" => first.map_or(Self::Usage("cd <path>"), Self::Cd),
            "cat" => first.map_or(Self::Usage("cat <name>"), Self::Cat),
            "clear" => Self::Clear,
            "exit" => Self::Exit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

// =============================================================================
// Line Execution
// =============================================================================

/// Parse and execute one line of input.
///
/// `cwd` is the shell's working directory token, updated by `cd`.
/// `progress` receives lines to show while a command is still running.
pub async fn execute_line(
    line: &str,
    fs: &mut DriveFs,
    cwd: &mut String,
    progress: &mut dyn FnMut(&str),
) -> CommandResult {
    let Some(parsed) = parse_input(line) else {
        return CommandResult::empty();
    };
    let cmd = Command::parse(&parsed.name, &parsed.args);
    execute_command(cmd, fs, cwd, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_ls() {
        assert_eq!(Command::parse("ls", &[]), Command::Ls(None));
        assert!(matches!(
            Command::parse("ls", &args(&["/"])),
            Command::Ls(Some(ref p)) if *p == "/"
        ));
    }

    #[test]
    fn test_parse_operands() {
        assert!(matches!(
            Command::parse("cd", &args(&["Team Space"])),
            Command::Cd(ref p) if *p == "Team Space"
        ));
        assert!(matches!(
            Command::parse("cat", &args(&["report.txt", "extra"])),
            Command::Cat(ref p) if *p == "report.txt"
        ));
        assert!(matches!(
            Command::parse("info", &args(&["Notes"])),
            Command::Info(ref p) if *p == "Notes"
        ));
    }

    #[test]
    fn test_parse_missing_operand() {
        assert_eq!(Command::parse("cd", &[]), Command::Usage("cd <path>"));
        assert_eq!(Command::parse("cat", &[]), Command::Usage("cat <name>"));
        assert_eq!(Command::parse("info", &[]), Command::Usage("info <name>"));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Command::parse("PWD", &[]), Command::Pwd);
        assert_eq!(Command::parse("Exit", &[]), Command::Exit);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Command::parse("mkdir", &args(&["x"])),
            Command::Unknown("mkdir".to_string())
        );
    }

    #[test]
    fn test_command_names() {
        let names = Command::names();
        for name in names {
            assert!(!matches!(Command::parse(name, &args(&["x"])), Command::Unknown(_)));
        }
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
