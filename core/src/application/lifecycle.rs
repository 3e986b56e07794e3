//! Sibling instance shutdown.

use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::domain::{descendants, is_sibling, SelfIdentity};
use crate::error::Result;
use crate::ports::ProcessTable;

/// Time allowed for killed processes to exit before re-checking.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(4);

/// Application service that finds and terminates other running instances.
///
/// Uses the `ProcessTable` trait so tests can supply synthetic process
/// lists.
pub struct LifecycleService<T: ProcessTable> {
    table: T,
    me: SelfIdentity,
    settle: Duration,
}

impl<T: ProcessTable> LifecycleService<T> {
    pub fn new(table: T, me: SelfIdentity) -> Self {
        Self {
            table,
            me,
            settle: DEFAULT_SETTLE,
        }
    }

    /// Override the wait between killing and re-checking.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Kill every sibling instance and its descendants.
    ///
    /// Returns the number of siblings found. Per-process failures are logged
    /// and skipped.
    pub fn terminate_siblings(&self) -> Result<usize> {
        let mut records = self.table.snapshot()?;
        records.sort_by(|a, b| b.pid.cmp(&a.pid));
        let me = self.me.with_parent_from(&records);

        let mut found = 0;
        for record in records.iter().filter(|r| is_sibling(r, &me)) {
            found += 1;
            tracing::debug!(pid = record.pid, "Terminating Px instance");

            for child in descendants(&records, record.pid) {
                self.kill_quietly(child);
            }
            self.kill_quietly(record.pid);
        }
        Ok(found)
    }

    fn kill_quietly(&self, pid: u32) {
        match self.table.kill(pid) {
            Ok(()) => {}
            Err(e) if e.is_transient_scan_error() => {
                tracing::trace!(pid, error = %e, "Process already gone or inaccessible");
            }
            Err(e) => tracing::warn!(pid, error = %e, "Failed to kill process"),
        }
    }

    /// Stop all other instances, reporting progress to `out`.
    ///
    /// With `check_only` nothing is killed unless something is still running,
    /// and the return value says whether the system is quiescent. Without it,
    /// found instances are killed, given time to exit, then re-checked.
    pub fn quit(&self, check_only: bool, out: &mut dyn Write) -> Result<bool> {
        let found = self.terminate_siblings()?;

        let quiet = if found == 0 {
            if check_only {
                writeln!(out, " DONE")?;
            } else {
                writeln!(out, "Px is not running")?;
            }
            true
        } else if check_only {
            writeln!(out, " Failed")?;
            false
        } else {
            write!(out, "Quitting Px ..")?;
            out.flush()?;
            thread::sleep(self.settle);
            return self.quit(true, out);
        };
        Ok(quiet)
    }
}
