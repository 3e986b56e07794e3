//! Process table port (interface).

use crate::domain::ProcessRecord;
use crate::error::Result;

/// Port for enumerating and terminating OS processes.
///
/// Implementations handle platform-specific details (procfs, ps, CIM).
pub trait ProcessTable: Send + Sync {
    /// Snapshot every visible process.
    ///
    /// Processes whose details cannot be read are still listed with the
    /// unreadable fields left empty.
    fn snapshot(&self) -> Result<Vec<ProcessRecord>>;

    /// Kill a process immediately (SIGKILL / TerminateProcess).
    ///
    /// A process that has already exited yields [`crate::Error::NoSuchProcess`].
    fn kill(&self, pid: u32) -> Result<()>;
}
