//! Error types for the px-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for px operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving configuration or controlling processes.
///
/// The first group are fatal misconfigurations: the binary reports them and
/// exits before any partial startup.
#[derive(Error, Debug)]
pub enum Error {
    /// An explicitly requested config file does not exist.
    #[error("Could not find config file: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// PAC location is neither a URL nor an existing file.
    #[error("Unsupported PAC location or file not found: {0}")]
    InvalidPac(String),

    /// Authentication scheme is not supported by the transport.
    #[error("Unsupported authentication scheme: {0}")]
    UnsupportedAuth(String),

    /// Password flow requested without a configured username.
    #[error("domain\\username missing - specify via --username or configure in px.ini")]
    MissingUsername,

    /// A value could not be coerced to its declared type.
    #[error(transparent)]
    Validation(#[from] crate::config::ValidationError),

    /// An allow or noproxy rule could not be parsed.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to kill a process.
    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    /// Permission denied for an operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The process disappeared while it was being inspected.
    #[error("No such process: {0}")]
    NoSuchProcess(u32),

    /// Credential store failure.
    #[error("Credential store error: {0}")]
    Credential(String),

    /// OS proxy auto-detection failure.
    #[error("Proxy discovery failed: {0}")]
    Discovery(String),

    /// The debug log destination could not be installed.
    #[error("Failed to set up logging: {0}")]
    Logging(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Whether this error is expected while scanning other processes
    /// (the process exited mid-scan or belongs to another user).
    pub fn is_transient_scan_error(&self) -> bool {
        match self {
            Error::NoSuchProcess(_) | Error::PermissionDenied(_) => true,
            Error::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                ) || is_esrch(e)
            }
            _ => false,
        }
    }
}

/// Reading `/proc/<pid>/*` of a process that exited after `open` fails
/// with ESRCH, which has no `ErrorKind` of its own.
#[cfg(unix)]
fn is_esrch(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32)
}

#[cfg(not(unix))]
fn is_esrch(_: &std::io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ConfigNotFound(PathBuf::from("/tmp/missing.ini"));
        assert!(err.to_string().contains("/tmp/missing.ini"));

        let err = Error::UnsupportedAuth("KERBEROS5".to_string());
        assert!(err.to_string().contains("KERBEROS5"));
    }

    #[test]
    fn test_transient_scan_errors() {
        assert!(Error::NoSuchProcess(42).is_transient_scan_error());
        assert!(Error::PermissionDenied("pid 1".into()).is_transient_scan_error());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::Io(io).is_transient_scan_error());
        assert!(!Error::CommandFailed("ps".into()).is_transient_scan_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_esrch_read_is_transient() {
        let io = std::io::Error::from_raw_os_error(nix::errno::Errno::ESRCH as i32);
        assert!(Error::Io(io).is_transient_scan_error());
        let io = std::io::Error::from_raw_os_error(nix::errno::Errno::EIO as i32);
        assert!(!Error::Io(io).is_transient_scan_error());
    }
}
