//! Line tokenization.
//!
//! A line is split on runs of whitespace into a command name and its arguments.
//! There is no quoting grammar, escaping or metacharacter handling here: quotes are
//! ordinary characters. The one quote-aware rule, used by `echo`, lives in
//! [`join_quoted`] and is applied by the command itself.

use thiserror::Error;

/// A tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Errors that can occur while tokenizing a line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line contained nothing but whitespace.
    #[error("Invalid command. Please try again.")]
    EmptyLine,
}

/// Split `line` into a command name and argument tokens.
///
/// # Returns
/// `Err(ParseError::EmptyLine)` if the line has no tokens at all.
pub fn parse_line(line: &str) -> Result<ParsedCommand, ParseError> {
    let mut tokens = line.split_whitespace().map(String::from);
    let name = tokens.next().ok_or(ParseError::EmptyLine)?;
    Ok(ParsedCommand {
        name,
        args: tokens.collect(),
    })
}

/// Rejoin a quoted multi-word message.
///
/// Applies only when there are at least two tokens, the first starting with `"` and
/// the last ending with `"`. Tokens are joined with single spaces and every `"` is
/// removed.
pub fn join_quoted(args: &[String]) -> Option<String> {
    match args {
        [first, .., last] if first.starts_with('"') && last.ends_with('"') => {
            Some(args.join(" ").replace('"', ""))
        }
        _ => None,
    }
}
