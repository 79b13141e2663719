//! Signal dispositions around a supervised run
//!
//! Kept in its own test binary: dispositions are process-wide, and nothing
//! else here installs handlers.
#![cfg(unix)]

use markitdown_mcp_launcher::{supervise, ChildCommand, ChildOutcome, LaunchError, Mode};

const SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

fn disposition(signal: libc::c_int) -> libc::sighandler_t {
    let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sigaction(signal, std::ptr::null(), &mut current) };
    assert_eq!(rc, 0, "sigaction query failed for {}", signal);
    current.sa_sigaction
}

fn dispositions() -> Vec<libc::sighandler_t> {
    SIGNALS.iter().map(|&s| disposition(s)).collect()
}

#[test]
fn test_handlers_are_restored_after_supervision() {
    let before = dispositions();
    assert_eq!(disposition(libc::SIGTERM), libc::SIG_DFL);

    let command = ChildCommand::new("/bin/sh", vec!["-c".to_string(), "exit 0".to_string()]);
    let outcome = supervise(&command, Mode::Transparent).unwrap();
    assert_eq!(outcome, ChildOutcome::Exited(0));
    assert_eq!(dispositions(), before);
    assert_eq!(disposition(libc::SIGTERM), libc::SIG_DFL);

    // A failed spawn must not leave the forwarding handlers behind either
    let dir = tempfile::TempDir::new().unwrap();
    let program = dir.path().join("python");
    std::fs::write(&program, "not a program").unwrap();
    let err = supervise(&ChildCommand::new(&program, Vec::new()), Mode::Transparent).unwrap_err();
    assert!(matches!(err, LaunchError::Spawn { .. }));
    assert_eq!(dispositions(), before);
}
