//! Multi-stage pipelines.

use crate::error::ShellError;
use crate::external::{ExternalCommand, ProcessGroup, StageIo, spawn};
use crate::job::{ForegroundJob, JobControl, JobOutcome};
use nix::unistd::pipe;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tracing::debug;

/// Run `stages` as one foreground job, stage `i` writing into stage `i + 1`.
///
/// All `n - 1` pipes are created before the first fork; if that fails nothing
/// is spawned. Every stage joins the group of the first one, so one interrupt
/// takes down the whole pipeline. Exit statuses are not collected.
pub fn execute_pipeline(
    stages: &[String],
    control: &JobControl,
    max_args: usize,
) -> Result<JobOutcome, ShellError> {
    let commands: Vec<ExternalCommand> = stages
        .iter()
        .map(|stage| ExternalCommand::new(stage, None, max_args))
        .collect();
    let n = commands.len();

    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n.saturating_sub(1));
    for _ in 1..n {
        pipes.push(pipe().map_err(|e| ShellError::resource("pipe", e))?);
    }
    let pipe_fds: Vec<RawFd> = pipes
        .iter()
        .flat_map(|(read, write)| [read.as_raw_fd(), write.as_raw_fd()])
        .collect();
    debug!(stages = n, pipes = pipes.len(), "pipeline wired");

    let mut job: Option<ForegroundJob<'_>> = None;
    for (i, cmd) in commands.iter().enumerate() {
        let io = StageIo {
            stdin: (i > 0).then(|| pipes[i - 1].0.as_raw_fd()),
            stdout: (i + 1 < n).then(|| pipes[i].1.as_raw_fd()),
            close: &pipe_fds,
            terminal: control.is_interactive(),
        };
        let group = match &job {
            None => ProcessGroup::New,
            Some(job) => ProcessGroup::Join(job.pgid()),
        };
        match spawn(cmd, group, &io) {
            Ok(pid) => match job.as_mut() {
                None => job = Some(control.launch(pid)),
                Some(job) => job.add(pid),
            },
            Err(e) => {
                drop(pipes);
                if let Some(job) = job {
                    job.abandon();
                }
                return Err(e);
            }
        }
    }

    // The parent holds no part of the data path.
    drop(pipes);

    Ok(job.map_or(JobOutcome::Completed, ForegroundJob::wait))
}
