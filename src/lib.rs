//! A small interactive shell with pipelines, redirections and job control.
//!
//! Every line typed at the prompt is recorded in a bounded history, split into
//! `;`-separated statements and run one statement at a time. A statement is
//! either one of the built-ins (`exit`, `history`) or is parsed by operator
//! priority into a pipeline (`|`), a conditional pair (`&&`), a redirection
//! (`>>`, `>`, `<`) or a plain external command.
//!
//! External commands run in their own process group, which owns the terminal
//! for as long as it runs. Ctrl-C kills that group and leaves the shell alive.
//!
//! The main entry point is [`Interpreter`]. The public modules [`config`],
//! [`history`] and [`job`] expose the knobs, the history buffer and the
//! signal plumbing used by the binary.

mod builtin;
pub mod command;
pub mod config;
pub mod error;
mod external;
pub mod history;
mod interpreter;
pub mod job;
mod lexer;
mod parser;
mod pipeline;

/// Just a convenient re-export of the interactive shell.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use config::ShellConfig;
pub use error::{ParseError, ShellError};
