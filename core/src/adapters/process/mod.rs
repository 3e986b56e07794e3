//! Process table adapters.
//!
//! Platform-specific process enumeration and termination.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

use crate::domain::ProcessRecord;
use crate::error::Result;
use crate::ports::ProcessTable;

/// The process table for the current platform.
pub struct SystemProcessTable {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinProcessTable,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxProcessTable,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsProcessTable,
}

impl SystemProcessTable {
    /// Create a process table for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinProcessTable::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxProcessTable::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsProcessTable::new(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        self.inner.snapshot()
    }

    fn kill(&self, pid: u32) -> Result<()> {
        self.inner.kill(pid)
    }
}

/// Add one scanned record. Per-process failures never abort the scan.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn keep_scanned(records: &mut Vec<ProcessRecord>, pid: u32, scanned: Result<ProcessRecord>) {
    match scanned {
        Ok(record) => records.push(record),
        Err(e) if e.is_transient_scan_error() => {
            tracing::trace!(pid = pid, error = %e, "Process vanished during scan");
        }
        Err(e) => {
            tracing::warn!(pid = pid, error = %e, "Skipping unreadable process");
        }
    }
}

/// Send SIGKILL, mapping errno to the scan error taxonomy.
#[cfg(unix)]
fn kill_unix(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    use crate::error::Error;

    let raw = i32::try_from(pid).map_err(|_| Error::NoSuchProcess(pid))?;
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => {
            tracing::debug!(pid = pid, "SIGKILL sent");
            Ok(())
        }
        Err(Errno::ESRCH) => Err(Error::NoSuchProcess(pid)),
        Err(Errno::EPERM) => Err(Error::PermissionDenied(format!("kill {}", pid))),
        Err(e) => Err(Error::KillFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

/// Split a command line on whitespace, honoring double quotes.
#[cfg_attr(target_os = "linux", allow(dead_code))]
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}
