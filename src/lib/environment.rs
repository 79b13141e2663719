//! Reusable virtual environment provisioning
//!
//! The environment lives at a deterministic per-user location. Creating the
//! venv and installing the package are separate steps, so a failed install is
//! retried on the next run without recreating the venv. Nothing here ever
//! deletes the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::args_parser::Mode;
use crate::config::{venv_python, LaunchConfig};
use crate::error::{LaunchError, ProvisioningStep, Result};
use crate::runtime_detector::RuntimeHandle;

/// Marker written after a successful install
pub const MARKER_FILE: &str = ".provisioned.json";

/// Lines of captured stderr kept in a provisioning error
const STDERR_TAIL_LINES: usize = 20;

/// Observed state of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    /// Directory or interpreter missing
    Absent,
    /// Interpreter present but the package is not registered
    Stale,
    /// Interpreter present and package registered
    Ready,
}

impl EnvironmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentState::Absent => "absent",
            EnvironmentState::Stale => "stale",
            EnvironmentState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The external installer commands the provisioner drives
pub trait Installer {
    /// Create an isolated environment at `env_path` using the base interpreter
    fn create_environment(&self, runtime: &RuntimeHandle, env_path: &Path) -> Result<()>;

    /// Install `package` with the environment's interpreter
    fn install_package(&self, python: &Path, package: &str) -> Result<()>;

    /// Metadata check: is `package` registered as installed?
    fn is_package_installed(&self, python: &Path, package: &str) -> bool;
}

/// `python -m venv` + `python -m pip` installer
#[derive(Debug, Clone, Copy)]
pub struct PipInstaller {
    mode: Mode,
}

impl PipInstaller {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Run a provisioning command, routing its output according to the mode
    fn run_step(&self, step: ProvisioningStep, command: &mut Command) -> Result<()> {
        let program = command.get_program().to_string_lossy().to_string();
        command.stdin(Stdio::null());

        let output = if self.mode.allows_diagnostics() {
            // Nothing to protect on stdout, but keep it clean for the server anyway
            command
                .stdout(Stdio::from(std::io::stderr()))
                .stderr(Stdio::inherit())
                .status()
                .map(|status| Output {
                    status,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
        } else {
            command
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
        };

        let output = output.map_err(|e| {
            LaunchError::provisioning(step, format!("could not run {}: {}", program, e))
        })?;

        if output.status.success() {
            return Ok(());
        }

        let mut detail = match output.status.code() {
            Some(code) => format!("exit code: {}", code),
            None => "terminated by signal".to_string(),
        };
        let tail = stderr_tail(&output.stderr);
        if !tail.is_empty() {
            detail.push('\n');
            detail.push_str(&tail);
        }
        Err(LaunchError::provisioning(step, detail))
    }
}

impl Installer for PipInstaller {
    fn create_environment(&self, runtime: &RuntimeHandle, env_path: &Path) -> Result<()> {
        let mut command = Command::new(&runtime.command);
        command.arg("-m").arg("venv").arg(env_path);
        self.run_step(ProvisioningStep::CreateEnvironment, &mut command)
    }

    fn install_package(&self, python: &Path, package: &str) -> Result<()> {
        let mut command = Command::new(python);
        command.args(["-m", "pip", "install", package]);
        self.run_step(ProvisioningStep::InstallPackage, &mut command)
    }

    fn is_package_installed(&self, python: &Path, package: &str) -> bool {
        Command::new(python)
            .args(["-m", "pip", "show", "--quiet", package])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Informational record of the last successful install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionMarker {
    pub package: String,
    pub base_python: String,
    pub python_version: String,
    pub installed_at: String,
}

impl ProvisionMarker {
    pub fn new(package: &str, runtime: &RuntimeHandle) -> Self {
        Self {
            package: package.to_string(),
            base_python: runtime.command.clone(),
            python_version: runtime.version.to_string(),
            installed_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn read(env_path: &Path) -> Option<Self> {
        let content = fs::read_to_string(env_path.join(MARKER_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn write(&self, env_path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(env_path.join(MARKER_FILE), content)
    }
}

/// Ensures the environment for one purpose is ready to run the server
pub struct EnvironmentProvisioner<'a, I: Installer> {
    config: &'a LaunchConfig,
    installer: I,
}

impl<'a, I: Installer> EnvironmentProvisioner<'a, I> {
    pub fn new(config: &'a LaunchConfig, installer: I) -> Self {
        Self { config, installer }
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }

    /// Location of the environment
    pub fn environment_path(&self) -> PathBuf {
        self.config.environment_path()
    }

    /// Classify the environment without modifying it
    pub fn state(&self) -> EnvironmentState {
        let env_path = self.environment_path();
        let python = venv_python(&env_path);
        if !env_path.is_dir() || !python.exists() {
            return EnvironmentState::Absent;
        }
        if self
            .installer
            .is_package_installed(&python, self.config.package_name())
        {
            EnvironmentState::Ready
        } else {
            EnvironmentState::Stale
        }
    }

    /// Make the environment `Ready`; idempotent, safe on every invocation
    pub fn ensure_ready(&self, runtime: &RuntimeHandle) -> Result<PathBuf> {
        let env_path = self.environment_path();
        let state = self.state();
        tracing::debug!("Environment {} is {}", env_path.display(), state);

        match state {
            EnvironmentState::Ready => {
                match ProvisionMarker::read(&env_path) {
                    Some(marker) => tracing::info!(
                        "Environment already set up ({} installed {})",
                        marker.package,
                        marker.installed_at
                    ),
                    None => tracing::info!("Environment already set up"),
                }
                return Ok(env_path);
            }
            EnvironmentState::Absent => {
                tracing::info!("Setting up MarkItDown MCP environment...");
                self.create(runtime, &env_path)?;
                self.install(runtime, &env_path)?;
            }
            EnvironmentState::Stale => {
                tracing::info!(
                    "{} missing from existing environment, reinstalling...",
                    self.config.package_name()
                );
                self.install(runtime, &env_path)?;
            }
        }

        tracing::info!("Environment setup complete: {}", env_path.display());
        Ok(env_path)
    }

    fn create(&self, runtime: &RuntimeHandle, env_path: &Path) -> Result<()> {
        if let Some(parent) = env_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LaunchError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        tracing::info!("Creating Python virtual environment...");
        self.installer.create_environment(runtime, env_path)?;

        // A venv that "succeeded" without an interpreter is still unusable
        let python = venv_python(env_path);
        if !python.exists() {
            return Err(LaunchError::provisioning(
                ProvisioningStep::CreateEnvironment,
                format!("interpreter missing after creation: {}", python.display()),
            ));
        }
        tracing::info!("Virtual environment created");
        Ok(())
    }

    fn install(&self, runtime: &RuntimeHandle, env_path: &Path) -> Result<()> {
        tracing::info!("Installing {}...", self.config.package);
        self.installer
            .install_package(&venv_python(env_path), &self.config.package)?;
        tracing::info!("{} installed successfully", self.config.package_name());

        if let Err(e) = ProvisionMarker::new(&self.config.package, runtime).write(env_path) {
            tracing::warn!("Could not write provisioning marker: {}", e);
        }
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
