use crate::builtin::default_builtins;
use crate::command::{CommandFactory, ExecutableCommand, ShellState};
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::external::{ExternalCommand, ProcessGroup, StageIo, spawn};
use crate::job::{self, JobControl, JobOutcome};
use crate::lexer::split_statements;
use crate::parser::{self, AstNode, Redirection};
use crate::pipeline::execute_pipeline;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use tracing::{debug, info};

/// An interactive shell with pipelines, redirections, `&&` and job control.
///
/// The interpreter owns the [`ShellState`] (history and exit request), the
/// built-in factories and the shell's side of job control. Statements are run
/// one at a time; every external command or pipeline becomes a foreground job.
///
/// Example
/// ```no_run
/// use pipesh::{Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(ShellConfig::default());
/// sh.run_line("echo hello > greeting.txt; cat < greeting.txt").unwrap();
/// ```
pub struct Interpreter {
    config: ShellConfig,
    state: ShellState,
    builtins: Vec<Box<dyn CommandFactory>>,
    jobs: JobControl,
}

impl Interpreter {
    /// Create an interpreter with the `exit` and `history` builtins.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_job_control(config, JobControl::new())
    }

    /// Create an interpreter that hands the terminal around through `jobs`.
    pub fn with_job_control(config: ShellConfig, jobs: JobControl) -> Self {
        let state = ShellState::new(config.history_capacity);
        Self {
            config,
            state,
            builtins: default_builtins(),
            jobs,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn should_exit(&self) -> bool {
        self.state.should_exit
    }

    /// Record one raw line and run each of its `;`-separated statements.
    ///
    /// Parse errors and failing built-ins are reported on stderr and the next
    /// statement runs. Only a fatal error is returned; `exit` stops the line.
    pub fn run_line(&mut self, line: &str) -> Result<(), ShellError> {
        self.run_line_with_output(line, &mut std::io::stdout())
    }

    /// Same as [`Interpreter::run_line`], with built-in output going to `out`.
    pub fn run_line_with_output(
        &mut self,
        line: &str,
        out: &mut dyn Write,
    ) -> Result<(), ShellError> {
        self.state.history.record(line);
        for statement in split_statements(line) {
            match self.execute_statement_with_output(statement, out) {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => eprintln!("pipesh: {}", e),
            }
            if self.state.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// Run one statement and report whether its foreground job was interrupted.
    pub fn execute_statement(&mut self, statement: &str) -> Result<JobOutcome, ShellError> {
        self.execute_statement_with_output(statement, &mut std::io::stdout())
    }

    fn execute_statement_with_output(
        &mut self,
        statement: &str,
        out: &mut dyn Write,
    ) -> Result<JobOutcome, ShellError> {
        let statement = statement.trim();
        if let Some(builtin) = self.find_builtin(statement) {
            if let Err(e) = builtin.execute(out, &mut self.state) {
                eprintln!("pipesh: {}: {:#}", statement, e);
            }
            out.flush()?;
            return Ok(JobOutcome::Completed);
        }

        match parser::parse_statement(statement, &self.config)? {
            AstNode::Empty => Ok(JobOutcome::Completed),
            AstNode::Pipeline(stages) => {
                execute_pipeline(&stages, &self.jobs, self.config.max_args)
            }
            AstNode::And { left, right } => {
                let outcome = self.execute_statement_with_output(&left, out)?;
                if outcome == JobOutcome::Interrupted || self.state.should_exit {
                    debug!(skipped = %right, ?outcome, "right side of && not run");
                    return Ok(outcome);
                }
                self.execute_statement_with_output(&right, out)
            }
            AstNode::Redirect { command, redirect } => {
                self.run_foreground(&command, Some(redirect))
            }
            AstNode::Command(command) => self.run_foreground(&command, None),
        }
    }

    /// Builtins only match when the whole statement is their name.
    fn find_builtin(&self, statement: &str) -> Option<Box<dyn ExecutableCommand>> {
        self.builtins
            .iter()
            .find_map(|factory| factory.try_create(statement, &[]))
    }

    fn run_foreground(
        &self,
        command: &str,
        redirect: Option<Redirection>,
    ) -> Result<JobOutcome, ShellError> {
        let cmd = ExternalCommand::new(command, redirect, self.config.max_args);
        let io = StageIo {
            terminal: self.jobs.is_interactive(),
            ..StageIo::inherit()
        };
        let pid = spawn(&cmd, ProcessGroup::New, &io)?;
        Ok(self.jobs.launch(pid).wait())
    }

    /// Read-Eval-Print Loop on top of [`rustyline`].
    ///
    /// Returns when `exit` runs or input ends (after printing a newline), and
    /// with an error when a fatal error stops the shell. Ctrl-C at the prompt
    /// only starts a fresh line.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;
        info!(interactive = self.jobs.is_interactive(), "repl started");

        loop {
            // The handler already moved to a fresh line.
            let prompt = if job::take_interrupted() {
                ""
            } else {
                self.config.prompt.as_str()
            };
            match rl.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    self.run_line(&line)?;
                    if self.state.should_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    /// Release the interpreter state.
    pub fn shutdown(mut self) {
        debug!(recorded = self.state.history.total_recorded(), "shutting down");
        self.state.shutdown();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::lock_jobs;
    use nix::sys::signal::{Signal, killpg};
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    fn shell() -> Interpreter {
        Interpreter::with_job_control(ShellConfig::default(), JobControl::detached())
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_redirect_round_trip() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let copy = dir.path().join("copy.txt");
        let mut sh = shell();

        sh.run_line(&format!("echo hi > {}", out.display())).unwrap();
        sh.run_line(&format!(
            "cp /dev/stdin {} < {}",
            copy.display(),
            out.display()
        ))
        .unwrap();

        assert_eq!(read(&out), "hi\n");
        assert_eq!(read(&copy), "hi\n");
    }

    #[test]
    fn test_append_twice() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        let line = format!("echo a >> {}", out.display());
        sh.run_line(&line).unwrap();
        sh.run_line(&line).unwrap();

        assert_eq!(read(&out), "a\na\n");
    }

    #[test]
    fn test_statements_run_in_order() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        sh.run_line(&format!(
            "echo one > {p}; echo two >> {p};; echo three >> {p}",
            p = out.display()
        ))
        .unwrap();

        assert_eq!(read(&out), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_and_ignores_exit_status() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        let outcome = sh
            .execute_statement(&format!("false && echo X > {}", out.display()))
            .unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(read(&out), "X\n");
    }

    #[test]
    fn test_interrupted_left_side_skips_right() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        // Plays the part of Ctrl-C: hit the job's group as soon as it is in front.
        let interrupter = thread::spawn(|| {
            let deadline = Instant::now() + Duration::from_secs(10);
            while Instant::now() < deadline {
                if let Some(pgid) = job::foreground_pgid() {
                    let _ = killpg(pgid, Signal::SIGINT);
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
        });

        let started = Instant::now();
        let outcome = sh
            .execute_statement(&format!("sleep 30 && echo X > {}", out.display()))
            .unwrap();
        interrupter.join().unwrap();

        assert_eq!(outcome, JobOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(20));
        assert!(!out.exists());
    }

    #[test]
    fn test_exit_stops_the_line() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        sh.run_line(&format!("exit; echo late > {}", out.display()))
            .unwrap();

        assert!(sh.should_exit());
        assert!(!out.exists());
    }

    #[test]
    fn test_exit_on_left_of_and_skips_right() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        sh.run_line(&format!("exit && echo late > {}", out.display()))
            .unwrap();

        assert!(sh.should_exit());
        assert!(!out.exists());
    }

    #[test]
    fn test_builtin_needs_exact_match() {
        let _lock = lock_jobs();
        let mut sh = shell();
        let mut out = Vec::new();

        // Runs as an external program named "exit", which does not exist.
        sh.run_line_with_output("exit now", &mut out).unwrap();
        assert!(!sh.should_exit());

        sh.run_line_with_output("  history  ", &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   1: exit now\n   2:   history  \n"
        );
    }

    #[test]
    fn test_parse_errors_are_not_fatal() {
        let _lock = lock_jobs();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut sh = shell();

        sh.run_line(&format!("> nowhere; echo ok > {}", out.display()))
            .unwrap();

        assert_eq!(read(&out), "ok\n");
        assert_eq!(
            sh.execute_statement("echo hi >").unwrap_err().to_string(),
            "missing redirection target"
        );
    }

    #[test]
    fn test_every_line_is_recorded() {
        let _lock = lock_jobs();
        let config = ShellConfig {
            history_capacity: 2,
            ..ShellConfig::default()
        };
        let mut sh = Interpreter::with_job_control(config, JobControl::detached());
        let mut out = Vec::new();

        sh.run_line_with_output("", &mut out).unwrap();
        sh.run_line_with_output("true", &mut out).unwrap();
        sh.run_line_with_output("history", &mut out).unwrap();

        assert_eq!(sh.state().history.len(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   2: true\n   3: history\n"
        );
    }
}
