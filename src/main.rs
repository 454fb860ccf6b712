use pipesh::{Interpreter, ShellConfig, job};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env("PIPESH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let config = ShellConfig::from_env();
    tracing::debug!(?config, "starting");
    job::install_signal_handlers()?;

    let mut shell = Interpreter::new(config);
    let result = shell.repl();
    shell.shutdown();
    result
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pipesh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
