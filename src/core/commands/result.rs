//! Command execution result type.

use crate::models::OutputLine;

/// Result of executing a command.
///
/// Commands produce output and may ask the shell to stop.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandResult {
    /// Output lines to display
    pub output: Vec<OutputLine>,
    /// Whether the shell should exit after displaying the output
    pub exit: bool,
}

impl CommandResult {
    /// Create a result with just output.
    pub fn output(lines: Vec<OutputLine>) -> Self {
        Self {
            output: lines,
            exit: false,
        }
    }

    /// Create a result with a single error line.
    pub fn error(message: impl Into<String>) -> Self {
        Self::output(vec![OutputLine::error(message)])
    }

    /// Create an empty result.
    pub fn empty() -> Self {
        Self::output(vec![])
    }

    /// Create a result that ends the shell.
    pub fn exit() -> Self {
        Self {
            output: vec![],
            exit: true,
        }
    }
}
