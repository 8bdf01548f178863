//! Command line tokenizer.
//!
//! Splits input on whitespace. Quotes group words so that titles with spaces
//! can be addressed:
//! - `"double quoted"` supports `\"`, `\\`, `\n` and `\t` escapes
//! - `'single quoted'` is taken literally
//!
//! Quoted and unquoted parts written next to each other form one word
//! (`Team' 'Space` is `Team Space`). An unclosed quote runs to the end of
//! the input.

use std::iter::Peekable;
use std::str::Chars;

/// Lexer for tokenizing shell input
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Tokenize the entire input into a vector
    pub fn tokenize(self) -> Vec<String> {
        self.collect()
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn read_double_quoted(&mut self, word: &mut String) {
        while let Some(c) = self.chars.next() {
            match c {
                '"' => return,
                '\\' => match self.chars.next() {
                    Some('n') => word.push('\n'),
                    Some('t') => word.push('\t'),
                    Some(escaped) => word.push(escaped),
                    None => word.push('\\'),
                },
                _ => word.push(c),
            }
        }
    }

    fn read_single_quoted(&mut self, word: &mut String) {
        for c in self.chars.by_ref() {
            if c == '\'' {
                return;
            }
            word.push(c);
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        self.chars.peek()?;

        let mut word = String::new();
        while let Some(c) = self.chars.next_if(|c| !c.is_whitespace()) {
            match c {
                '"' => self.read_double_quoted(&mut word),
                '\'' => self.read_single_quoted(&mut word),
                _ => word.push(c),
            }
        }
        Some(word)
    }
}

// =============================================================================
// Parsed Command
// =============================================================================

/// A command name with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Split a line into command name and arguments; `None` for blank input.
pub fn parse_input(input: &str) -> Option<ParsedCommand> {
    let mut words = Lexer::new(input);
    let name = words.next()?;
    Some(ParsedCommand {
        name,
        args: words.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        assert_eq!(Lexer::new("ls").tokenize(), vec!["ls"]);
        assert_eq!(Lexer::new("  cd   Notes  ").tokenize(), vec!["cd", "Notes"]);
        assert!(Lexer::new("   ").tokenize().is_empty());
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            Lexer::new("cd \"Team Space\"").tokenize(),
            vec!["cd", "Team Space"]
        );
        assert_eq!(
            Lexer::new("info 'Todo list'").tokenize(),
            vec!["info", "Todo list"]
        );
        assert_eq!(Lexer::new("cd Team' 'Space").tokenize(), vec!["cd", "Team Space"]);
        assert_eq!(Lexer::new("cat ''").tokenize(), vec!["cat", ""]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            Lexer::new(r#"cat "a \"b\" \\ c""#).tokenize(),
            vec!["cat", r#"a "b" \ c"#]
        );
        assert_eq!(Lexer::new(r"cat 'a \n b'").tokenize(), vec!["cat", r"a \n b"]);
    }

    #[test]
    fn test_unclosed_quote() {
        assert_eq!(
            Lexer::new("cd \"Team Sp").tokenize(),
            vec!["cd", "Team Sp"]
        );
    }

    #[test]
    fn test_parse_input() {
        let parsed = parse_input("cat \"My report\" extra").unwrap();
        assert_eq!(parsed.name, "cat");
        assert_eq!(parsed.args, vec!["My report", "extra"]);
        assert_eq!(parse_input(""), None);
    }
}
