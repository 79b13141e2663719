//! Server process supervision
//!
//! The server is spawned with the launcher's own stdin/stdout/stderr; nothing
//! is buffered or intercepted, since in stdio mode those streams carry the MCP
//! protocol. The launcher's exit status mirrors the server's.

use std::path::{Path, PathBuf};
use std::process::{self, Command, ExitStatus, Stdio};

use crate::args_parser::{LaunchOptions, Mode};
use crate::config::{venv_python, LaunchConfig};
use crate::error::{LaunchError, Result};
use crate::logging::report_fatal;
use crate::signal_handler::{signal_name, SignalForwarding};

/// Exit code used when the server was killed by a signal
pub const SIGNAL_FALLBACK_EXIT_CODE: i32 = 1;

/// How the server ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Normal exit with a code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
}

impl ChildOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ChildOutcome::Signaled(signal);
            }
        }
        ChildOutcome::Exited(status.code().unwrap_or(SIGNAL_FALLBACK_EXIT_CODE))
    }

    /// Exit code the launcher terminates with
    pub fn exit_code(&self) -> i32 {
        match self {
            ChildOutcome::Exited(code) => *code,
            ChildOutcome::Signaled(_) => SIGNAL_FALLBACK_EXIT_CODE,
        }
    }
}

/// Program and arguments of the supervised process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ChildCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `<env>/bin/python -m <module> <forwarded args...>`
    pub fn server(env_path: &Path, config: &LaunchConfig, options: &LaunchOptions) -> Self {
        let mut args = vec!["-m".to_string(), config.module.clone()];
        args.extend(options.forwarded.iter().cloned());
        Self::new(venv_python(env_path), args)
    }
}

/// Spawn the child, forward signals while it runs and wait for it
pub fn supervise(command: &ChildCommand, mode: Mode) -> Result<ChildOutcome> {
    if !command.program.exists() {
        return Err(LaunchError::ChildNotFound(command.program.clone()));
    }

    tracing::info!("Starting MarkItDown MCP server...");
    tracing::debug!("{} {}", command.program.display(), command.args.join(" "));

    // Armed before spawn so an early signal is held for the child
    let forwarding = SignalForwarding::arm();
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            program: command.program.display().to_string(),
            source: e,
        })?;

    forwarding.forward_to(child.id());
    let waited = child.wait();
    let forwarded = forwarding.forwarded_signal();
    drop(forwarding);

    let status = waited.map_err(|e| LaunchError::io("Failed to wait for server", e))?;
    let outcome = ChildOutcome::from_status(status);
    report_outcome(outcome, forwarded, mode);
    Ok(outcome)
}

/// Run the server from a provisioned environment and exit with its status
pub fn run(env_path: &Path, config: &LaunchConfig, options: &LaunchOptions, mode: Mode) -> ! {
    let command = ChildCommand::server(env_path, config, options);
    match supervise(&command, mode) {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(e) => {
            report_fatal(&e);
            process::exit(1);
        }
    }
}

fn report_outcome(outcome: ChildOutcome, forwarded: Option<i32>, mode: Mode) {
    if !mode.allows_diagnostics() {
        return;
    }
    match outcome {
        ChildOutcome::Signaled(signal) => {
            tracing::info!("MCP server terminated by signal: {}", signal_name(signal));
        }
        ChildOutcome::Exited(code) if code != 0 => {
            tracing::error!("MCP server exited with code: {}", code);
        }
        ChildOutcome::Exited(_) => {}
    }
    if let Some(signal) = forwarded {
        tracing::debug!("Forwarded {} to the server", signal_name(signal));
    }
}
