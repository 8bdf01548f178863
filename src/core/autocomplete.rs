//! Tab completion for shell commands and drive names.
//!
//! Completes:
//! - Command names (e.g., "cl" → "clear")
//! - `cd` targets: folders, shared folders and shared folder titles
//! - Names in the current folder for `cat`, `info`, `ls`
//!
//! A single match completes the whole line; several matches complete their
//! common prefix and list the options. Names containing spaces are offered
//! in double quotes.

use crate::core::{Command, DriveFs};

// ============================================================================
// Public Types
// ============================================================================

/// Result of an autocomplete attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum AutocompleteResult {
    /// Single exact match - complete with this value.
    Single(String),
    /// Multiple matches - (common_prefix, all_matches).
    Multiple(String, Vec<String>),
    /// No matches found.
    None,
}

/// Commands whose argument is a `cd` target.
const CD_COMMANDS: &[&str] = &["cd"];

/// Commands whose argument is a name in the current folder.
const NAME_COMMANDS: &[&str] = &["cat", "info", "ls"];

// ============================================================================
// Completion Context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompletionMode {
    Command,
    CdTarget,
    Name,
    None,
}

impl CompletionMode {
    fn from_input(input: &str) -> (Self, Vec<&str>) {
        let parts: Vec<&str> = input.splitn(2, ' ').collect();

        if parts.len() == 1 {
            return (Self::Command, parts);
        }

        let cmd_lower = parts[0].to_lowercase();
        let mode = if CD_COMMANDS.contains(&cmd_lower.as_str()) {
            Self::CdTarget
        } else if NAME_COMMANDS.contains(&cmd_lower.as_str()) {
            Self::Name
        } else {
            Self::None
        };

        (mode, parts)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Perform autocomplete on Tab press.
///
/// `cwd` is the shell's working directory token.
pub fn autocomplete(input: &str, cwd: &str, fs: &DriveFs) -> AutocompleteResult {
    let input = input.trim_start();
    if input.is_empty() {
        return AutocompleteResult::None;
    }

    let (mode, parts) = CompletionMode::from_input(input);
    match mode {
        CompletionMode::Command => complete_command(parts[0]),
        CompletionMode::CdTarget | CompletionMode::Name => {
            let partial = parts[1].trim_start().trim_start_matches('"');
            let matches = if mode == CompletionMode::CdTarget {
                fs.complete_cd(cwd, partial)
            } else {
                fs.complete(cwd, partial)
            };
            build_name_result(parts[0], matches)
        }
        CompletionMode::None => AutocompleteResult::None,
    }
}

// ============================================================================
// Command Completion
// ============================================================================

fn complete_command(partial: &str) -> AutocompleteResult {
    let partial_lower = partial.to_lowercase();
    let matches: Vec<String> = Command::names()
        .iter()
        .filter(|cmd| cmd.starts_with(&partial_lower))
        .map(|s| s.to_string())
        .collect();

    match matches.len() {
        0 => AutocompleteResult::None,
        1 => AutocompleteResult::Single(format!("{} ", matches[0])),
        _ => {
            let common = find_common_prefix(&matches);
            AutocompleteResult::Multiple(common, matches)
        }
    }
}

// ============================================================================
// Name Completion
// ============================================================================

fn build_name_result(cmd: &str, matches: Vec<String>) -> AutocompleteResult {
    match matches.len() {
        0 => AutocompleteResult::None,
        1 => AutocompleteResult::Single(format!("{} {} ", cmd, quote(&matches[0]))),
        _ => {
            let common = find_common_prefix(&matches);
            let open = if matches.iter().any(|m| needs_quotes(m)) { "\"" } else { "" };
            AutocompleteResult::Multiple(format!("{} {}{}", cmd, open, common), matches)
        }
    }
}

fn needs_quotes(name: &str) -> bool {
    name.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'')
}

fn quote(name: &str) -> String {
    if needs_quotes(name) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Find the common prefix of multiple strings.
fn find_common_prefix(strings: &[String]) -> String {
    if strings.is_empty() {
        return String::new();
    }
    if strings.len() == 1 {
        return strings[0].clone();
    }

    let first = &strings[0];
    let mut prefix_len = first.len();

    for s in &strings[1..] {
        prefix_len = first
            .char_indices()
            .zip(s.chars())
            .take_while(|((i, a), b)| *i < prefix_len && a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8());
    }

    first[..prefix_len].to_string()
}

// ============================================================================
// Tests
// ============================================================================
