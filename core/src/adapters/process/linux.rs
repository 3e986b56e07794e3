//! Linux process table implementation using procfs.
//!
//! Reads `/proc/<pid>/stat` for the parent pid, `/proc/<pid>/exe` for the
//! resolved executable and `/proc/<pid>/cmdline` for arguments.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::domain::ProcessRecord;
use crate::error::{Error, Result};

const PROC_ROOT: &str = "/proc";

/// Linux-specific process table.
pub struct LinuxProcessTable;

impl LinuxProcessTable {
    /// Create a new Linux process table.
    pub fn new() -> Self {
        Self
    }

    /// Read one process. `NoSuchProcess` if it exited mid-read.
    fn read_record(&self, dir: &Path, pid: u32) -> Result<ProcessRecord> {
        let stat = fs::read_to_string(dir.join("stat")).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NoSuchProcess(pid),
            _ => Error::Io(e),
        })?;

        // Unreadable for other users' processes; keep the record without it
        let exe = fs::read_link(dir.join("exe")).ok().map(|p| {
            let p = p.to_string_lossy().into_owned();
            p.strip_suffix(" (deleted)").map(str::to_string).unwrap_or(p)
        });

        let cmdline = fs::read(dir.join("cmdline"))
            .map(|raw| parse_cmdline(&raw))
            .unwrap_or_default();

        Ok(ProcessRecord {
            pid,
            ppid: parse_ppid(&stat),
            exe,
            cmdline,
        })
    }

    pub fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(PROC_ROOT)? {
            let Ok(entry) = entry else { continue };
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };

            super::keep_scanned(&mut records, pid, self.read_record(&entry.path(), pid));
        }

        Ok(records)
    }

    pub fn kill(&self, pid: u32) -> Result<()> {
        super::kill_unix(pid)
    }
}

/// Parent pid from `/proc/<pid>/stat`.
///
/// The command name is parenthesized and may itself contain spaces or
/// parentheses, so fields are counted from the last `)`.
fn parse_ppid(stat: &str) -> Option<u32> {
    let (_, rest) = stat.rsplit_once(')')?;
    // state ppid ...
    rest.split_whitespace().nth(1)?.parse().ok()
}

fn parse_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ppid() {
        assert_eq!(parse_ppid("1234 (px) S 1 1234 1234 0 -1"), Some(1));
        assert_eq!(parse_ppid("99 (weird) name)) R 42 99 99"), Some(42));
        assert_eq!(parse_ppid("garbage"), None);
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(
            parse_cmdline(b"/opt/px/px\0--port=3129\0"),
            vec!["/opt/px/px", "--port=3129"]
        );
        assert!(parse_cmdline(b"").is_empty());
    }

    #[test]
    fn test_read_own_record() {
        let table = LinuxProcessTable::new();
        let pid = std::process::id();
        let record = table
            .read_record(&Path::new(PROC_ROOT).join(pid.to_string()), pid)
            .unwrap();
        assert_eq!(record.pid, pid);
        assert!(record.exe.is_some());
        assert!(!record.cmdline.is_empty());
    }
}
