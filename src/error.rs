//! Error taxonomy of the interpreter.
//!
//! Only [`ShellError::Resource`] stops the shell. Everything else is either
//! reported and skipped in the parent, or printed by a forked child right
//! before it exits.

use nix::errno::Errno;
use thiserror::Error;

/// Errors found while splitting a statement or a command string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An operator left nothing to run on one of its sides.
    #[error("empty command")]
    EmptyCommand,
    /// A redirection operator with no file after it.
    #[error("missing redirection target")]
    MissingTarget,
    /// More `|`-separated stages than the pipeline can hold.
    #[error("too many pipeline stages (limit {0})")]
    TooManyStages(usize),
    /// More words than the argument vector can hold.
    #[error("too many arguments (limit {0})")]
    TooManyArguments(usize),
    /// The command text contains a NUL byte and cannot become a C string.
    #[error("command contains a NUL byte")]
    InteriorNul,
}

/// Anything that can go wrong while running a statement.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Pipe, fork or signal setup failed. Fatal to the shell.
    #[error("{op}: {source}")]
    Resource {
        op: &'static str,
        #[source]
        source: Errno,
    },

    /// The program image could not be replaced. Raised in the child only.
    #[error("execvp: {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: Errno,
    },

    /// A redirection file could not be opened. Raised in the child only.
    #[error("open: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Errno,
    },

    /// Built-in output could not be written.
    #[error("write: {0}")]
    Output(#[from] std::io::Error),
}

impl ShellError {
    pub(crate) fn resource(op: &'static str, source: Errno) -> Self {
        ShellError::Resource { op, source }
    }

    /// Whether the interpreter has to stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Resource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resource_errors_are_fatal() {
        assert!(ShellError::resource("fork", Errno::EAGAIN).is_fatal());
        assert!(!ShellError::from(ParseError::EmptyCommand).is_fatal());
        let exec = ShellError::Exec {
            program: "nope".to_string(),
            source: Errno::ENOENT,
        };
        assert!(!exec.is_fatal());
    }

    #[test]
    fn messages_name_the_failing_operation() {
        let err = ShellError::resource("pipe", Errno::EMFILE);
        assert!(err.to_string().starts_with("pipe: "));

        let err = ShellError::Io {
            path: "out.txt".to_string(),
            source: Errno::EACCES,
        };
        assert!(err.to_string().starts_with("open: out.txt: "));

        let err = ShellError::from(ParseError::TooManyStages(10));
        assert_eq!(err.to_string(), "too many pipeline stages (limit 10)");
    }
}
