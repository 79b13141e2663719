//! Launcher configuration
//!
//! Built once at startup from environment variables and passed by reference
//! to every component. Nothing reads process-wide state after this point.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identifier of the environment this launcher serves
pub const DEFAULT_PURPOSE: &str = "markitdown-mcp";
/// Package installed into the environment
pub const DEFAULT_PACKAGE: &str = "markitdown-mcp";
/// Module executed with `python -m`
pub const DEFAULT_MODULE: &str = "markitdown_mcp";
/// Minimum accepted interpreter version
pub const MIN_PYTHON_VERSION: (u32, u32) = (3, 10);
/// Upper bound for a single `--version` probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const VENV_DIR_NAME: &str = "venv";

/// Immutable launcher configuration
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Per-user root under which environments live
    pub cache_root: PathBuf,
    /// Environment key; one environment per purpose
    pub purpose: String,
    /// pip requirement to install
    pub package: String,
    /// Python module to run
    pub module: String,
    /// Interpreter commands in priority order
    pub candidates: Vec<String>,
    /// Minimum (major, minor) interpreter version
    pub min_version: (u32, u32),
    /// Timeout applied to each interpreter probe
    pub probe_timeout: Duration,
    /// Debug-level diagnostics
    pub debug: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            purpose: DEFAULT_PURPOSE.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
            module: DEFAULT_MODULE.to_string(),
            candidates: default_candidates(),
            min_version: MIN_PYTHON_VERSION,
            probe_timeout: PROBE_TIMEOUT,
            debug: false,
        }
    }
}

impl LaunchConfig {
    /// Read overrides from `MARKITDOWN_MCP_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let candidates = env::var("MARKITDOWN_MCP_PYTHON")
            .ok()
            .map(|v| parse_candidates(&v))
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.candidates);

        Self {
            cache_root: env::var_os("MARKITDOWN_MCP_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_root),
            package: env::var("MARKITDOWN_MCP_PACKAGE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.package),
            candidates,
            debug: env_bool("MARKITDOWN_MCP_DEBUG"),
            ..defaults
        }
    }

    /// Deterministic environment location for this purpose
    pub fn environment_path(&self) -> PathBuf {
        self.cache_root.join(&self.purpose).join(VENV_DIR_NAME)
    }

    /// Bare package name (without version specifiers), as `pip show` expects
    pub fn package_name(&self) -> &str {
        let end = self
            .package
            .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | ' '))
            .unwrap_or(self.package.len());
        &self.package[..end]
    }
}

/// Interpreter binary inside an environment
pub fn venv_python(env_path: &Path) -> PathBuf {
    if cfg!(windows) {
        env_path.join("Scripts").join("python.exe")
    } else {
        env_path.join("bin").join("python")
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(env::temp_dir)
}

fn default_candidates() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &["py", "python", "python3"]
    } else {
        &["python3", "python"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

fn parse_candidates(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn env_bool(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1" || v == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_path_is_deterministic() {
        let config = LaunchConfig {
            cache_root: PathBuf::from("/tmp/cache"),
            ..LaunchConfig::default()
        };
        assert_eq!(
            config.environment_path(),
            PathBuf::from("/tmp/cache/markitdown-mcp/venv")
        );
        assert_eq!(config.environment_path(), config.environment_path());
    }

    #[test]
    fn test_parse_candidates() {
        assert_eq!(
            parse_candidates(" python3.12 , ,/usr/bin/python3"),
            vec!["python3.12", "/usr/bin/python3"]
        );
        assert!(parse_candidates(" , ").is_empty());
    }

    #[test]
    fn test_package_name_strips_specifiers() {
        let mut config = LaunchConfig::default();
        assert_eq!(config.package_name(), "markitdown-mcp");
        config.package = "markitdown-mcp==0.0.1a4".to_string();
        assert_eq!(config.package_name(), "markitdown-mcp");
        config.package = "markitdown-mcp[all]>=0.1".to_string();
        assert_eq!(config.package_name(), "markitdown-mcp");
    }

    #[test]
    fn test_venv_python_location() {
        let python = venv_python(Path::new("env"));
        if cfg!(windows) {
            assert!(python.ends_with("Scripts/python.exe"));
        } else {
            assert_eq!(python, PathBuf::from("env/bin/python"));
        }
    }

    #[test]
    fn test_defaults() {
        let config = LaunchConfig::default();
        assert_eq!(config.min_version, (3, 10));
        assert_eq!(config.module, "markitdown_mcp");
        assert!(!config.candidates.is_empty());
    }
}
