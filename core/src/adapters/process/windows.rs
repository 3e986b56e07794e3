//! Windows process table implementation.
//!
//! Uses the following system commands:
//! - `Get-CimInstance Win32_Process` (PowerShell) for the process list
//! - `taskkill /PID xxx /F` for forced termination

use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::domain::ProcessRecord;
use crate::error::{Error, Result};

use super::split_args;

const SNAPSHOT_SCRIPT: &str = "Get-CimInstance Win32_Process | \
    Select-Object ProcessId,ParentProcessId,ExecutablePath,CommandLine | \
    ConvertTo-Json -Compress";

/// One row of `Win32_Process`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CimProcess {
    process_id: u32,
    parent_process_id: Option<u32>,
    executable_path: Option<String>,
    command_line: Option<String>,
}

impl From<CimProcess> for ProcessRecord {
    fn from(p: CimProcess) -> Self {
        ProcessRecord {
            pid: p.process_id,
            ppid: p.parent_process_id,
            exe: p.executable_path.filter(|s| !s.is_empty()),
            cmdline: p.command_line.as_deref().map(split_args).unwrap_or_default(),
        }
    }
}

/// Windows-specific process table.
pub struct WindowsProcessTable;

impl WindowsProcessTable {
    /// Create a new Windows process table.
    pub fn new() -> Self {
        Self
    }

    pub fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", SNAPSHOT_SCRIPT])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed(format!("powershell: {}", e)))?;

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "Get-CimInstance exited with {}",
                output.status
            )));
        }

        parse_snapshot(&String::from_utf8_lossy(&output.stdout))
    }

    /// Terminate a process using taskkill /F.
    pub fn kill(&self, pid: u32) -> Result<()> {
        tracing::debug!(pid = pid, "Executing taskkill");

        let output = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let combined = format!("{} {}", stdout, stderr);

        if combined.contains("not found") || combined.contains("could not be found") {
            return Err(Error::NoSuchProcess(pid));
        }

        if combined.contains("Access is denied") || combined.contains("access denied") {
            return Err(Error::PermissionDenied(format!("taskkill {}", pid)));
        }

        if combined.contains("already been terminated") || combined.contains("has exited") {
            return Err(Error::NoSuchProcess(pid));
        }

        Err(Error::KillFailed {
            pid,
            reason: combined.trim().to_string(),
        })
    }
}

/// ConvertTo-Json emits a bare object when there is a single row.
fn parse_snapshot(json: &str) -> Result<Vec<ProcessRecord>> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<CimProcess> = if json.starts_with('[') {
        serde_json::from_str(json)?
    } else {
        vec![serde_json::from_str(json)?]
    };
    Ok(rows.into_iter().map(ProcessRecord::from).collect())
}
