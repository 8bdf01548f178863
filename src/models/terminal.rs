//! Terminal-related data types for output rendering.

use std::fmt;

const BLUE: &str = "\x1b[34m";
const BRIGHT_BLUE: &str = "\x1b[94m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Escape sequence that resets the terminal.
pub const CLEAR_SCREEN: &str = "\x1bc";

/// Text styling for drive listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextStyle {
    /// Folder of the current drive (bright blue)
    Directory,
    /// Mount of another drive (blue)
    SharedFolder,
    /// Document (plain)
    File,
}

impl TextStyle {
    fn color(self) -> Option<&'static str> {
        match self {
            Self::Directory => Some(BRIGHT_BLUE),
            Self::SharedFolder => Some(BLUE),
            Self::File => None,
        }
    }
}

/// A single line of shell output.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputLine {
    /// Plain text output
    Text(String),
    /// Error message (red)
    Error(String),
    /// Empty line
    Empty,
    /// Terminal reset
    Clear,
    /// Listing entry: `name` padded to `width`, then `- title`
    ListEntry {
        name: String,
        title: Option<String>,
        style: TextStyle,
        width: usize,
    },
}

impl OutputLine {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    /// Folder entry; folders show their own name as title.
    pub fn dir_entry(name: impl Into<String>, width: usize) -> Self {
        let name = name.into();
        Self::ListEntry {
            title: Some(name.clone()),
            name,
            style: TextStyle::Directory,
            width,
        }
    }

    pub fn shared_entry(name: impl Into<String>, title: Option<String>, width: usize) -> Self {
        Self::ListEntry {
            name: name.into(),
            title: title.filter(|t| !t.is_empty()),
            style: TextStyle::SharedFolder,
            width,
        }
    }

    pub fn file_entry(name: impl Into<String>, title: Option<String>, width: usize) -> Self {
        Self::ListEntry {
            name: name.into(),
            title: title.filter(|t| !t.is_empty()),
            style: TextStyle::File,
            width,
        }
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Error(s) => write!(f, "{}{}{}", RED, s, RESET),
            Self::Empty => Ok(()),
            Self::Clear => f.write_str(CLEAR_SCREEN),
            Self::ListEntry {
                name,
                title,
                style,
                width,
            } => {
                let label = match title {
                    Some(title) => format!("{:<width$}- {}", name, title, width = width),
                    None => name.clone(),
                };
                match style.color() {
                    Some(color) => write!(f, "{}{}{}", color, label, RESET),
                    None => f.write_str(&label),
                }
            }
        }
    }
}
