//! Python interpreter detection
//!
//! Candidates are probed in priority order with `<cmd> --version`. A probe that
//! fails to start, times out, or reports an old version simply yields `None`;
//! only running out of candidates is an error.

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::LaunchConfig;
use crate::error::{LaunchError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Interpreter version as reported by `--version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    /// Whether this version satisfies the (major, minor) floor; the major must match exactly
    pub fn satisfies(&self, min: (u32, u32)) -> bool {
        self.major == min.0 && self.minor >= min.1
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A resolved interpreter command and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeHandle {
    pub command: String,
    pub version: PythonVersion,
}

/// Parse output such as "Python 3.12.1" or "Python 3.13.0rc2"
pub fn parse_python_version(output: &str) -> Option<PythonVersion> {
    let re = regex::Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").ok()?;
    let caps = re.captures(output)?;

    Some(PythonVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
        patch: caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
    })
}

/// Probe one candidate command; `None` means "not present" for any reason
pub fn probe(command: &str, timeout: Duration) -> Option<RuntimeHandle> {
    let output = run_with_timeout(command, &["--version"], timeout)?;
    let version = parse_python_version(&output)?;
    tracing::debug!("{} --version -> {}", command, version);
    Some(RuntimeHandle {
        command: command.to_string(),
        version,
    })
}

/// Resolve the first candidate that satisfies the version floor
pub fn resolve(config: &LaunchConfig) -> Result<RuntimeHandle> {
    for candidate in &config.candidates {
        match probe(candidate, config.probe_timeout) {
            Some(handle) if handle.version.satisfies(config.min_version) => {
                tracing::info!("Found Python: {} ({})", handle.command, handle.version);
                return Ok(handle);
            }
            Some(handle) => {
                tracing::debug!(
                    "{} is Python {} (need {}.{}+), skipping",
                    handle.command,
                    handle.version,
                    config.min_version.0,
                    config.min_version.1
                );
            }
            None => {
                tracing::debug!("{}: not available", candidate);
            }
        }
    }

    Err(LaunchError::RuntimeNotFound {
        min_major: config.min_version.0,
        min_minor: config.min_version.1,
        tried: config.candidates.clone(),
    })
}

/// Run a short query command, returning combined stdout+stderr on success
fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    // Drained while polling so a chatty child cannot block on a full pipe
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => {
                tracing::debug!("{} timed out after {:?}", program, timeout);
                abandon(&mut child);
                return None;
            }
            Err(e) => {
                tracing::debug!("Failed to poll {}: {}", program, e);
                abandon(&mut child);
                return None;
            }
        }
    };

    if !status.success() {
        return None;
    }

    // Old interpreters print the version on stderr
    let mut combined = String::new();
    for reader in [stdout, stderr].into_iter().flatten() {
        if let Ok(bytes) = reader.join() {
            combined.push_str(&String::from_utf8_lossy(&bytes));
        }
    }
    Some(combined)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Kill and reap; reader threads are left detached in case a grandchild holds the pipe
fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_version() {
        assert_eq!(
            parse_python_version("Python 3.12.1\n"),
            Some(PythonVersion {
                major: 3,
                minor: 12,
                patch: 1
            })
        );
        assert_eq!(
            parse_python_version("Python 3.13.0rc2"),
            Some(PythonVersion {
                major: 3,
                minor: 13,
                patch: 0
            })
        );
        assert_eq!(
            parse_python_version("Python 2.7"),
            Some(PythonVersion {
                major: 2,
                minor: 7,
                patch: 0
            })
        );
        assert_eq!(parse_python_version("command not found"), None);
        assert_eq!(parse_python_version(""), None);
    }

    #[test]
    fn test_version_floor() {
        let v = |major, minor| PythonVersion {
            major,
            minor,
            patch: 0,
        };
        assert!(v(3, 10).satisfies((3, 10)));
        assert!(v(3, 13).satisfies((3, 10)));
        assert!(!v(3, 9).satisfies((3, 10)));
        assert!(!v(2, 7).satisfies((3, 10)));
        // A different major line is not accepted even if newer
        assert!(!v(4, 0).satisfies((3, 10)));
    }

    #[test]
    fn test_probe_missing_command_is_none() {
        assert!(probe("definitely-not-a-python-xyz", Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_resolve_exhausted_candidates() {
        let config = LaunchConfig {
            candidates: vec![
                "definitely-not-a-python-xyz".to_string(),
                "another-missing-python".to_string(),
            ],
            probe_timeout: Duration::from_secs(1),
            ..LaunchConfig::default()
        };
        let err = resolve(&config).unwrap_err();
        assert!(matches!(err, LaunchError::RuntimeNotFound { .. }));
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("another-missing-python"));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow-python");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\necho 'Python 3.12.0'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = Instant::now();
        let result = probe(script.to_str().unwrap(), Duration::from_millis(200));
        assert!(result.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_takes_first_qualifying_candidate() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let write_fake = |name: &str, version: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\necho 'Python {}'\n", version)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        };
        let old = write_fake("old-python", "3.8.10");
        let good = write_fake("good-python", "3.11.4");
        let newer = write_fake("newer-python", "3.13.0");

        let config = LaunchConfig {
            candidates: vec![old, good.clone(), newer],
            ..LaunchConfig::default()
        };
        let handle = resolve(&config).unwrap();
        assert_eq!(handle.command, good);
        assert_eq!(handle.version.to_string(), "3.11.4");
    }

    #[cfg(unix)]
    #[test]
    fn test_version_read_after_large_output() {
        use std::os::unix::fs::PermissionsExt;

        // Far more than a pipe buffer holds before the version line
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("noisy-python");
        std::fs::write(
            &script,
            "#!/bin/sh
             i=0
             while [ $i -lt 4000 ]; do
             echo 'warning: this line pads the output well past the pipe buffer size'
             i=$((i + 1))
             done
             echo 'Python 3.11.2'
",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let handle = probe(script.to_str().unwrap(), Duration::from_secs(10)).unwrap();
        assert_eq!(handle.version.to_string(), "3.11.2");
    }
}
