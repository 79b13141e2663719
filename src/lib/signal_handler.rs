//! Signal forwarding to the supervised server
//!
//! SIGINT, SIGTERM and SIGHUP received by the launcher are relayed to the
//! child. The handler never exits the launcher: the child's exit is the only
//! thing that ends the run. Handler state is process-global because Unix
//! signal handlers cannot reach instance data.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

#[cfg(unix)]
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const DONE: u8 = 2;

/// Phase of the supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    ShuttingDown,
    Done,
}

/// `Running -> ShuttingDown -> Done`; transitions are one-way
#[derive(Debug)]
pub struct ShutdownState(AtomicU8);

impl ShutdownState {
    pub const fn new() -> Self {
        Self(AtomicU8::new(RUNNING))
    }

    pub fn phase(&self) -> ShutdownPhase {
        match self.0.load(Ordering::SeqCst) {
            RUNNING => ShutdownPhase::Running,
            SHUTTING_DOWN => ShutdownPhase::ShuttingDown,
            _ => ShutdownPhase::Done,
        }
    }

    /// Enter `ShuttingDown`; returns false if shutdown already began or finished
    pub fn begin_shutdown(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// The child has exited
    pub fn finish(&self) {
        self.0.store(DONE, Ordering::SeqCst);
    }

    fn restart(&self) {
        self.0.store(RUNNING, Ordering::SeqCst);
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

static SHUTDOWN: ShutdownState = ShutdownState::new();
static CHILD_PID: AtomicI32 = AtomicI32::new(0);
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);
static FORWARDED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// One supervised child per process: the handler state above is shared
static ACTIVE: Mutex<()> = Mutex::new(());

#[cfg(unix)]
const FORWARDED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Dispositions replaced by `install_handlers`, restored on disarm
#[cfg(unix)]
static PREVIOUS_ACTIONS: Mutex<Vec<(Signal, SigAction)>> = Mutex::new(Vec::new());

/// Signal forwarding for the lifetime of one child
///
/// Armed before the child is spawned, so a signal arriving before the pid is
/// known is held and delivered by `forward_to`. Dropping it restores the
/// previous dispositions.
#[derive(Debug)]
pub struct SignalForwarding {
    _active: MutexGuard<'static, ()>,
}

impl SignalForwarding {
    pub fn arm() -> Self {
        let active = ACTIVE.lock().unwrap_or_else(|e| e.into_inner());
        CHILD_PID.store(0, Ordering::SeqCst);
        PENDING_SIGNAL.store(0, Ordering::SeqCst);
        FORWARDED_SIGNAL.store(0, Ordering::SeqCst);
        SHUTDOWN.restart();
        install_handlers();
        Self { _active: active }
    }

    /// Publish the child pid and deliver any signal received before it
    pub fn forward_to(&self, child_pid: u32) {
        let pid = child_pid as i32;
        CHILD_PID.store(pid, Ordering::SeqCst);
        deliver_pending(pid);
    }

    pub fn phase(&self) -> ShutdownPhase {
        SHUTDOWN.phase()
    }

    /// Signal relayed to the child, if any
    pub fn forwarded_signal(&self) -> Option<i32> {
        match FORWARDED_SIGNAL.load(Ordering::SeqCst) {
            0 => None,
            sig => Some(sig),
        }
    }
}

impl Drop for SignalForwarding {
    fn drop(&mut self) {
        SHUTDOWN.finish();
        CHILD_PID.store(0, Ordering::SeqCst);
        restore_handlers();
        // No child ever took the signal (spawn failed): act on it ourselves
        let pending = PENDING_SIGNAL.swap(0, Ordering::SeqCst);
        if pending != 0 {
            raise_signal(pending);
        }
    }
}

/// Human readable signal name, e.g. "SIGTERM"
#[cfg(unix)]
pub fn signal_name(signal: i32) -> String {
    Signal::try_from(signal)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {}", signal))
}

#[cfg(not(unix))]
pub fn signal_name(signal: i32) -> String {
    format!("signal {}", signal)
}

#[cfg(unix)]
fn install_handlers() {
    let action = SigAction::new(
        SigHandler::Handler(forward_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let mut previous = PREVIOUS_ACTIONS.lock().unwrap_or_else(|e| e.into_inner());
    previous.clear();
    for signal in FORWARDED_SIGNALS {
        // SAFETY: the handler only touches atomics and calls kill()
        match unsafe { sigaction(signal, &action) } {
            Ok(old) => previous.push((signal, old)),
            Err(e) => tracing::debug!("Failed to install handler for {}: {}", signal.as_str(), e),
        }
    }
}

#[cfg(unix)]
fn restore_handlers() {
    let mut previous = PREVIOUS_ACTIONS.lock().unwrap_or_else(|e| e.into_inner());
    for (signal, old) in previous.drain(..) {
        // SAFETY: reinstating a disposition that was in place before arming
        if let Err(e) = unsafe { sigaction(signal, &old) } {
            tracing::debug!("Failed to restore handler for {}: {}", signal.as_str(), e);
        }
    }
}

#[cfg(unix)]
fn raise_signal(sig: i32) {
    // SAFETY: plain libc call with a valid signal number
    unsafe {
        libc::raise(sig);
    }
}

#[cfg(unix)]
fn deliver_pending(pid: i32) {
    if pid <= 0 {
        return;
    }
    let sig = PENDING_SIGNAL.swap(0, Ordering::SeqCst);
    if sig != 0 {
        FORWARDED_SIGNAL.store(sig, Ordering::SeqCst);
        // SAFETY: kill() is async-signal-safe
        unsafe {
            libc::kill(pid, sig);
        }
    }
}

#[cfg(unix)]
extern "C" fn forward_signal(sig: libc::c_int) {
    if !SHUTDOWN.begin_shutdown() {
        return;
    }
    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        FORWARDED_SIGNAL.store(sig, Ordering::SeqCst);
        // SAFETY: kill() is async-signal-safe
        unsafe {
            libc::kill(pid, sig);
        }
        return;
    }
    PENDING_SIGNAL.store(sig, Ordering::SeqCst);
    // The pid may have been published while we were storing; whoever swaps first delivers
    deliver_pending(CHILD_PID.load(Ordering::SeqCst));
}

#[cfg(not(unix))]
fn install_handlers() {
    // Console control events reach the child's process group directly
}

#[cfg(not(unix))]
fn restore_handlers() {}

#[cfg(not(unix))]
fn raise_signal(_sig: i32) {}

#[cfg(not(unix))]
fn deliver_pending(_pid: i32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_state_transitions() {
        let state = ShutdownState::new();
        assert_eq!(state.phase(), ShutdownPhase::Running);

        assert!(state.begin_shutdown());
        assert_eq!(state.phase(), ShutdownPhase::ShuttingDown);

        // Repeated signals are no-ops
        assert!(!state.begin_shutdown());
        assert_eq!(state.phase(), ShutdownPhase::ShuttingDown);

        state.finish();
        assert_eq!(state.phase(), ShutdownPhase::Done);
        assert!(!state.begin_shutdown());
    }

    #[test]
    fn test_exit_without_signal_goes_straight_to_done() {
        let state = ShutdownState::default();
        state.finish();
        assert_eq!(state.phase(), ShutdownPhase::Done);
        assert!(!state.begin_shutdown());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_name() {
        assert_eq!(signal_name(libc::SIGTERM), "SIGTERM");
        assert_eq!(signal_name(libc::SIGINT), "SIGINT");
        assert_eq!(signal_name(9999), "signal 9999");
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_before_pid_is_delivered_once_child_is_known() {
        use std::os::unix::process::ExitStatusExt;

        let forwarding = SignalForwarding::arm();
        forward_signal(libc::SIGTERM);
        assert_eq!(forwarding.phase(), ShutdownPhase::ShuttingDown);
        assert_eq!(forwarding.forwarded_signal(), None);

        // Dropped: shutdown already began
        forward_signal(libc::SIGINT);

        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        forwarding.forward_to(child.id());
        let status = child.wait().unwrap();

        assert_eq!(status.signal(), Some(libc::SIGTERM));
        assert_eq!(forwarding.forwarded_signal(), Some(libc::SIGTERM));
    }

    #[cfg(unix)]
    #[test]
    fn test_only_first_signal_reaches_running_child() {
        use std::os::unix::process::ExitStatusExt;

        let forwarding = SignalForwarding::arm();
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        forwarding.forward_to(child.id());

        forward_signal(libc::SIGINT);
        forward_signal(libc::SIGTERM);
        let status = child.wait().unwrap();

        assert_eq!(status.signal(), Some(libc::SIGINT));
        assert_eq!(forwarding.forwarded_signal(), Some(libc::SIGINT));
        drop(forwarding);
        assert_eq!(SHUTDOWN.phase(), ShutdownPhase::Done);
    }
}
