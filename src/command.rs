use crate::history::HistoryBuffer;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Interpreter state visible to built-in commands.
///
/// There is one of these per shell. It is created by the interpreter and torn
/// down by [`ShellState::shutdown`], which releases the history.
#[derive(Debug, Clone)]
pub struct ShellState {
    /// Raw lines typed so far.
    pub history: HistoryBuffer,
    /// When set to true, the REPL stops before running anything else.
    pub should_exit: bool,
}

impl ShellState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::with_capacity(history_capacity),
            should_exit: false,
        }
    }

    /// Release everything the state owns.
    pub fn shutdown(&mut self) {
        self.history.clear();
    }
}

/// Object-safe trait for any command that runs inside the shell process.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
