//! Process liveness and termination signalling
//!
//! The instance guard needs exactly two operations against another
//! process: a zero-effect existence probe and a graceful quit request.
//! Both sit behind [`ProcessControl`] so guard tests can simulate dead
//! owners and refused signals without spawning real victim processes.

use std::io;

/// Liveness probe and graceful termination for a foreign process
pub trait ProcessControl {
    /// Check whether `pid` refers to a live process
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask `pid` to shut down
    ///
    /// Sends SIGQUIT; the target may trap it and clean up before
    /// exiting. Callers treat failure as "process already gone".
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Real signal delivery via the operating system
///
/// # Platform-specific behavior
///
/// - Unix: signal 0 for the probe, SIGQUIT for termination
/// - Windows: process-table lookup via sysinfo; terminate unsupported
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessControl;

impl ProcessControl for SystemProcessControl {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // pid 0 would address our own process group
        if pid == 0 {
            return false;
        }

        // Signal 0 probes existence without delivering anything.
        // EPERM means the process exists but belongs to another user.
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(windows)]
    fn is_alive(&self, pid: u32) -> bool {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_processes();
        sys.process(sysinfo::Pid::from_u32(pid)).is_some()
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if pid == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "pid 0"));
        }

        kill(Pid::from_raw(pid as i32), Signal::SIGQUIT).map_err(io::Error::from)
    }

    #[cfg(windows)]
    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "graceful terminate not supported on this platform",
        ))
    }
}

/// Check whether a process with the given PID is running
pub fn is_process_alive(pid: u32) -> bool {
    SystemProcessControl.is_alive(pid)
}
