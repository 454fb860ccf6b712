//! Splitting of raw input into statements and of commands into words.
//!
//! There is no quoting, escaping or expansion: `;` always ends a statement and
//! any run of whitespace separates two words.

use crate::error::ParseError;
use std::ffi::CString;

/// Separator between independent statements on one line.
pub const STATEMENT_SEPARATOR: char = ';';

/// Split a raw line into its `;`-separated statements.
///
/// Empty pieces (`a;;b`, a trailing `;`) are skipped. Statements are returned
/// untrimmed; the operator splitter trims them.
pub fn split_statements(line: &str) -> impl Iterator<Item = &str> {
    line.split(STATEMENT_SEPARATOR).filter(|s| !s.is_empty())
}

/// Split a command into its words.
///
/// Fails with [`ParseError::EmptyCommand`] when there is nothing but whitespace
/// and with [`ParseError::TooManyArguments`] when more than `max_words` words
/// are present.
pub fn split_words(command: &str, max_words: usize) -> Result<Vec<&str>, ParseError> {
    let mut words = Vec::new();
    for word in command.split_whitespace() {
        if words.len() == max_words {
            return Err(ParseError::TooManyArguments(max_words));
        }
        words.push(word);
    }
    if words.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    Ok(words)
}

/// Build the argument vector handed to `execvp`.
///
/// The terminating null pointer is added by `execvp` itself, which is why a
/// command may have at most `max_args - 1` words.
pub fn split_args(command: &str, max_args: usize) -> Result<Vec<CString>, ParseError> {
    split_words(command, max_args.saturating_sub(1))?
        .into_iter()
        .map(|word| CString::new(word).map_err(|_| ParseError::InteriorNul))
        .collect()
}
