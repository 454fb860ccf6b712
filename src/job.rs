//! Foreground job control.
//!
//! Every spawned unit (a single command or a whole pipeline) runs in its own
//! process group. While the shell waits for it, the group owns the controlling
//! terminal and its id sits in [`FOREGROUND_PGID`] so that the SIGINT handler
//! can kill it. Once every member has been reaped the terminal goes back to the
//! shell's group.

use crate::error::ShellError;
use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, killpg, sigaction};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{Pid, getpgrp, isatty, tcsetpgrp};
use std::io;
use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::{debug, warn};

/// Process group of the job currently in the foreground, `0` when there is none.
static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);

/// Set by the SIGINT handler, cleared by the REPL once per cycle.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signal: libc::c_int) {
    let pgid = FOREGROUND_PGID.swap(0, Ordering::SeqCst);
    if pgid > 0 {
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
    INTERRUPTED.store(true, Ordering::SeqCst);
    // SAFETY: write(2) is async-signal-safe and the buffer is static.
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
    }
}

/// Install the shell's signal dispositions.
///
/// SIGINT goes to [`handle_sigint`]; SIGTSTP and SIGTTOU are ignored for the
/// lifetime of the shell so that Ctrl-Z cannot stop it and handing the terminal
/// around never suspends it.
pub fn install_signal_handlers() -> Result<(), ShellError> {
    let interrupt = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    // SAFETY: the handler only touches atomics and calls killpg(2) and write(2).
    unsafe {
        sigaction(Signal::SIGINT, &interrupt).map_err(|e| ShellError::resource("sigaction", e))?;
        sigaction(Signal::SIGTSTP, &ignore).map_err(|e| ShellError::resource("sigaction", e))?;
        sigaction(Signal::SIGTTOU, &ignore).map_err(|e| ShellError::resource("sigaction", e))?;
    }
    Ok(())
}

/// Put the signals touched by the shell back to their defaults.
///
/// Called in a forked child right before `execvp`, so that the program reacts
/// to Ctrl-C and Ctrl-Z normally.
pub(crate) fn restore_child_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_DFL has no handler requirements.
    unsafe {
        let _ = sigaction(Signal::SIGINT, &default);
        let _ = sigaction(Signal::SIGTSTP, &default);
        let _ = sigaction(Signal::SIGTTOU, &default);
    }
}

/// Make `pgid` the terminal's foreground group from inside a forked child.
///
/// The parent does the same in [`JobControl::launch`]; doing it on both sides
/// means a program that reads the terminal right after exec is never a
/// background reader. Runs before the child resets SIGTTOU, so it cannot stop.
pub(crate) fn claim_terminal_in_child(pgid: Pid) {
    // SAFETY: stdin is open in the child until its own dup2 replaces it.
    let stdin = unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) };
    let _ = tcsetpgrp(stdin, pgid);
}

/// Read and clear the interrupt flag.
pub fn take_interrupted() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Process group currently in the foreground, if any.
pub fn foreground_pgid() -> Option<Pid> {
    match FOREGROUND_PGID.load(Ordering::SeqCst) {
        0 => None,
        pgid => Some(Pid::from_raw(pgid)),
    }
}

/// How a foreground job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every member exited on its own (whatever its status).
    Completed,
    /// The interrupt handler killed the group.
    Interrupted,
}

/// The shell side of job control: its own group and, when interactive, the terminal.
#[derive(Debug, Clone)]
pub struct JobControl {
    shell_pgid: Pid,
    interactive: bool,
}

impl JobControl {
    /// Capture the shell's process group and check whether stdin is a terminal.
    pub fn new() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: isatty(libc::STDIN_FILENO).unwrap_or(false),
        }
    }

    /// Job control that never touches the terminal, for embedding and tests.
    pub fn detached() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: false,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Make `pgid` the foreground job.
    ///
    /// Called right after the first process of a unit has been created.
    pub fn launch(&self, pgid: Pid) -> ForegroundJob<'_> {
        FOREGROUND_PGID.store(pgid.as_raw(), Ordering::SeqCst);
        if self.interactive {
            match tcsetpgrp(io::stdin(), pgid) {
                Ok(()) => debug!(%pgid, "terminal handed to job"),
                Err(e) => warn!(%pgid, error = %e, "could not hand the terminal to the job"),
            }
        }
        ForegroundJob {
            control: self,
            pgid,
            members: vec![pgid],
        }
    }

    fn reclaim_terminal(&self) {
        if self.interactive {
            match tcsetpgrp(io::stdin(), self.shell_pgid) {
                Ok(()) => debug!(pgid = %self.shell_pgid, "terminal reclaimed"),
                Err(e) => warn!(error = %e, "could not reclaim the terminal"),
            }
        }
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit that currently owns the foreground.
///
/// Members are waited for in the order they were added.
#[derive(Debug)]
pub struct ForegroundJob<'a> {
    control: &'a JobControl,
    pgid: Pid,
    members: Vec<Pid>,
}

impl ForegroundJob<'_> {
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    /// Add another process of the same group.
    pub fn add(&mut self, pid: Pid) {
        self.members.push(pid);
    }

    /// Block until every member has terminated, then give the terminal back.
    ///
    /// A Ctrl-C typed while the job owns the terminal reaches the group
    /// directly, so a member killed by SIGINT also counts as an interrupt.
    pub fn wait(self) -> JobOutcome {
        let mut by_terminal = false;
        for pid in &self.members {
            by_terminal |= reap(*pid, self.pgid) == Some(Signal::SIGINT);
        }
        match self.finish() {
            JobOutcome::Completed if by_terminal => JobOutcome::Interrupted,
            outcome => outcome,
        }
    }

    /// Kill and reap a partially launched unit.
    pub fn abandon(self) {
        let _ = killpg(self.pgid, Signal::SIGKILL);
        for pid in &self.members {
            reap(*pid, self.pgid);
        }
        self.finish();
    }

    fn finish(self) -> JobOutcome {
        self.control.reclaim_terminal();
        let outcome = match FOREGROUND_PGID.compare_exchange(
            self.pgid.as_raw(),
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => JobOutcome::Completed,
            Err(_) => JobOutcome::Interrupted,
        };
        debug!(pgid = %self.pgid, ?outcome, "job finished");
        outcome
    }
}

/// Wait for one child of `group`, retrying when a signal interrupts the call.
///
/// A stopped member (SIGTTIN before it owned the terminal, a stray SIGSTOP)
/// would block the wait forever, so the whole group is resumed instead.
/// Returns the signal that killed the child, if any.
fn reap(pid: Pid, group: Pid) -> Option<Signal> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                debug!(%pid, status = code, "process exited");
                return None;
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                debug!(%pid, ?signal, "process killed");
                return Some(signal);
            }
            Ok(WaitStatus::Stopped(pid, signal)) => {
                debug!(%pid, ?signal, "process stopped, resuming its group");
                let _ = killpg(group, Signal::SIGCONT);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                debug!(%pid, error = %e, "nothing to wait for");
                return None;
            }
        }
    }
}
