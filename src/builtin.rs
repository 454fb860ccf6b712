use crate::command::{CommandFactory, ExecutableCommand, ExitCode, ShellState};
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "exit" or "history".
    fn name() -> &'static str;

    /// Executes the command against the interpreter state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        state: &mut ShellState,
    ) -> Result<ExitCode> {
        T::execute(*self, stdout, state)
    }
}

/// Factory for one builtin type.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        // Builtins take no arguments; anything else is left to the external path.
        match T::from_args(&[name], args) {
            Ok(cmd) => Some(Box::new(cmd)),
            Err(early) => {
                debug!(name, output = %early.output, "not a builtin invocation");
                None
            }
        }
    }
}

/// The factories for every builtin, in lookup order.
pub(crate) fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<History>::default()),
    ]
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        state.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the lines entered so far, numbered from the first line of the session.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        for (idx, line) in state.history.list() {
            writeln!(stdout, "{:4}: {}", idx, line)?;
        }
        Ok(0)
    }
}
