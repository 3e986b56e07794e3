//! macOS process table implementation using ps.
//!
//! Executes `ps -axo pid=,ppid=,comm=` for executable paths (macOS reports
//! the full path in `comm`) and `ps -axo pid=,args=` for command lines.

use std::collections::HashMap;
use std::process::{Command, Stdio};

use crate::domain::ProcessRecord;
use crate::error::{Error, Result};

use super::split_args;

/// macOS-specific process table.
pub struct DarwinProcessTable;

impl DarwinProcessTable {
    /// Create a new macOS process table.
    pub fn new() -> Self {
        Self
    }

    fn ps(&self, columns: &str) -> Result<String> {
        let output = Command::new("/bin/ps")
            .args(["-axo", columns])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed(format!("ps: {}", e)))?;

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "ps -axo {} exited with {}",
                columns, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let args = parse_args_listing(&self.ps("pid=,args=")?);
        let mut records = parse_comm_listing(&self.ps("pid=,ppid=,comm=")?);

        for record in &mut records {
            if let Some(cmdline) = args.get(&record.pid) {
                record.cmdline = cmdline.clone();
            }
        }

        Ok(records)
    }

    pub fn kill(&self, pid: u32) -> Result<()> {
        super::kill_unix(pid)
    }
}

/// Split off the first whitespace-delimited field.
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Parse `pid ppid comm` lines; comm may contain spaces.
fn parse_comm_listing(stdout: &str) -> Vec<ProcessRecord> {
    let mut records = Vec::new();

    for line in stdout.lines() {
        let Some((pid, rest)) = next_field(line) else {
            continue;
        };
        let Ok(pid) = pid.parse::<u32>() else {
            continue;
        };
        let (ppid, comm) = next_field(rest).unwrap_or(("", ""));
        let comm = comm.trim();

        records.push(ProcessRecord {
            pid,
            ppid: ppid.parse().ok(),
            exe: comm.starts_with('/').then(|| comm.to_string()),
            cmdline: Vec::new(),
        });
    }

    records
}

/// Parse `pid args` lines into argument vectors.
fn parse_args_listing(stdout: &str) -> HashMap<u32, Vec<String>> {
    let mut args = HashMap::new();

    for line in stdout.lines() {
        let Some((pid, rest)) = next_field(line) else {
            continue;
        };
        if let Ok(pid) = pid.parse::<u32>() {
            args.insert(pid, split_args(rest));
        }
    }

    args
}
