use crate::error::{ParseError, ShellError};
use crate::job::{claim_terminal_in_child, restore_child_signals};
use crate::lexer::split_args;
use crate::parser::{RedirectKind, Redirection};
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork, getpid, setpgid};
use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::RawFd;
use tracing::{debug, warn};

/// Command that is not a builtin: a program to run in a child process.
///
/// The argument vector is built when the command is created, so that the
/// forked child has nothing left to allocate for it. A command that cannot be
/// split still gets a process: the child reports the problem and exits.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    text: String,
    argv: Result<Vec<CString>, ParseError>,
    redirect: Option<Redirection>,
}

impl ExternalCommand {
    pub fn new(command: &str, redirect: Option<Redirection>, max_args: usize) -> Self {
        Self {
            text: command.to_owned(),
            argv: split_args(command, max_args),
            redirect,
        }
    }

    /// Name of the program, empty when the command has no words.
    pub fn program(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or_default()
    }

    /// Open the redirection, if any, and replace the process image.
    ///
    /// Only returns on failure.
    fn exec(&self) -> Result<Infallible, ShellError> {
        if let Some(redirect) = &self.redirect {
            apply_redirect(redirect)?;
        }
        let argv = self.argv.as_ref().map_err(|e| e.clone())?;
        execvp(argv[0].as_c_str(), argv.as_slice()).map_err(|source| ShellError::Exec {
            program: self.program().to_owned(),
            source,
        })
    }
}

/// Which process group a new child goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessGroup {
    /// A fresh group led by the child itself.
    New,
    /// The group of an earlier stage.
    Join(Pid),
}

/// Descriptor wiring of one child.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageIo<'a> {
    /// Becomes the child's standard input.
    pub stdin: Option<RawFd>,
    /// Becomes the child's standard output.
    pub stdout: Option<RawFd>,
    /// Closed in the child once the two above are in place.
    pub close: &'a [RawFd],
    /// Make the child's group the terminal's foreground group before exec.
    pub terminal: bool,
}

impl StageIo<'static> {
    /// Keep the shell's own stdin and stdout.
    pub fn inherit() -> Self {
        Self::default()
    }
}

/// Fork a child that runs `cmd` inside `group` with the given wiring.
///
/// The group is set from both sides of the fork so that it exists before the
/// parent hands it the terminal. A failed fork is a resource error.
pub fn spawn(
    cmd: &ExternalCommand,
    group: ProcessGroup,
    io: &StageIo<'_>,
) -> Result<Pid, ShellError> {
    // SAFETY: the child only rewires descriptors, resets signal dispositions and
    // then either execs or exits.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            let pgid = match group {
                ProcessGroup::New => child,
                ProcessGroup::Join(leader) => leader,
            };
            // EACCES: the child already exec'd after joining on its own.
            if let Err(e) = setpgid(child, pgid) {
                if e != Errno::EACCES {
                    warn!(pid = %child, %pgid, error = %e, "setpgid failed");
                }
            }
            debug!(pid = %child, %pgid, command = %cmd.text, "spawned");
            Ok(child)
        }
        Ok(ForkResult::Child) => run_child(cmd, group, io),
        Err(e) => Err(ShellError::resource("fork", e)),
    }
}

fn run_child(cmd: &ExternalCommand, group: ProcessGroup, io: &StageIo<'_>) -> ! {
    let pgid = match group {
        ProcessGroup::New => getpid(),
        ProcessGroup::Join(leader) => leader,
    };
    let _ = setpgid(Pid::from_raw(0), pgid);
    if io.terminal {
        claim_terminal_in_child(pgid);
    }
    restore_child_signals();

    if let Some(fd) = io.stdin {
        let _ = dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = io.stdout {
        let _ = dup2(fd, libc::STDOUT_FILENO);
    }
    for fd in io.close {
        let _ = close(*fd);
    }

    match cmd.exec() {
        Err(e) => die(&e),
        Ok(never) => match never {},
    }
}

fn apply_redirect(redirect: &Redirection) -> Result<(), ShellError> {
    let io_error = |source| ShellError::Io {
        path: redirect.target.clone(),
        source,
    };
    let (flags, target) = match redirect.kind {
        RedirectKind::Input => (OFlag::O_RDONLY, libc::STDIN_FILENO),
        RedirectKind::Output => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            libc::STDOUT_FILENO,
        ),
        RedirectKind::Append => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
            libc::STDOUT_FILENO,
        ),
    };
    let fd = open(
        redirect.target.as_str(),
        flags,
        Mode::from_bits_truncate(0o644),
    )
    .map_err(io_error)?;
    dup2(fd, target).map_err(io_error)?;
    let _ = close(fd);
    Ok(())
}

/// Report `err` on stderr and end the child without running any exit hooks.
fn die(err: &ShellError) -> ! {
    let msg = format!("pipesh: {}\n", err);
    // SAFETY: plain write(2) and _exit(2) on the child's own descriptors.
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(1)
    }
}
