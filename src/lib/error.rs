//! Error taxonomy for the launcher
//!
//! Every variant here is fatal for the launcher itself. A child that runs and
//! exits non-zero is not an error of this crate; its code is simply propagated.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which provisioning step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    /// Creating the isolated environment (`python -m venv`)
    CreateEnvironment,
    /// Installing the package into the environment (`pip install`)
    InstallPackage,
}

impl ProvisioningStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStep::CreateEnvironment => "create virtual environment",
            ProvisioningStep::InstallPackage => "install package",
        }
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fatal launcher errors
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Python {min_major}.{min_minor}+ is required but not found (tried: {})", .tried.join(", "))]
    RuntimeNotFound {
        min_major: u32,
        min_minor: u32,
        tried: Vec<String>,
    },

    #[error("Failed to {step}: {detail}")]
    Provisioning {
        step: ProvisioningStep,
        detail: String,
    },

    #[error("Server executable not found: {}", .0.display())]
    ChildNotFound(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub fn provisioning(step: ProvisioningStep, detail: impl Into<String>) -> Self {
        LaunchError::Provisioning {
            step,
            detail: detail.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LaunchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Remediation hint printed below the error message
    pub fn remediation(&self) -> &'static str {
        match self {
            LaunchError::RuntimeNotFound { .. } => {
                "Install Python 3.10 or newer and make sure `python3` (or `python`) is in your PATH,\n\
                 or point MARKITDOWN_MCP_PYTHON at a suitable interpreter."
            }
            LaunchError::Provisioning {
                step: ProvisioningStep::CreateEnvironment,
                ..
            } => {
                "Check that the Python `venv` module is available (e.g. `apt install python3-venv`)\n\
                 and that the cache directory is writable."
            }
            LaunchError::Provisioning {
                step: ProvisioningStep::InstallPackage,
                ..
            } => "Check internet connectivity for package installation; the next run retries the install.",
            LaunchError::ChildNotFound(_) => {
                "The environment looks incomplete. Re-run to repair it, or remove the cache directory."
            }
            LaunchError::Spawn { .. } => "Verify execute permissions on the environment's interpreter.",
            LaunchError::Io { .. } => "Verify write permissions to the cache directory.",
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_not_found_message() {
        let err = LaunchError::RuntimeNotFound {
            min_major: 3,
            min_minor: 10,
            tried: vec!["python3".to_string(), "python".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("3.10"));
        assert!(msg.contains("python3, python"));
    }

    #[test]
    fn test_provisioning_message_names_step() {
        let err = LaunchError::provisioning(ProvisioningStep::InstallPackage, "exit code 1");
        assert_eq!(err.to_string(), "Failed to install package: exit code 1");
        assert!(err.remediation().contains("retries"));
    }
}
