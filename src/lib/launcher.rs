//! Bootstrap sequence shared by the binary and integration tests

use std::path::PathBuf;

use crate::args_parser::Mode;
use crate::config::LaunchConfig;
use crate::environment::{EnvironmentProvisioner, PipInstaller};
use crate::error::Result;
use crate::optional_tools::report_optional_tools;
use crate::runtime_detector;

/// Resolve an interpreter and make the environment ready; returns its path
pub fn prepare_environment(config: &LaunchConfig, mode: Mode) -> Result<PathBuf> {
    let runtime = runtime_detector::resolve(config)?;

    let provisioner = EnvironmentProvisioner::new(config, PipInstaller::new(mode));
    let env_path = provisioner.ensure_ready(&runtime)?;

    if mode.allows_diagnostics() {
        report_optional_tools();
    }
    Ok(env_path)
}
