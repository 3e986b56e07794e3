//! Debug log destination and subscriber installation.
//!
//! Px logs nothing unless a destination is chosen. The first destination
//! installed wins for the life of the process.

use std::fs::File;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::HostContext;
use crate::error::{Error, Result};

/// `log` setting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLocation {
    #[default]
    None,
    /// `debug-<name>.log` next to the executable.
    InstallDir,
    /// `debug-<name>.log` in the working directory.
    WorkingDir,
    /// A uniquely named file in the working directory.
    UniqueFile,
    Stdout,
}

impl LogLocation {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => LogLocation::None,
            1 => LogLocation::InstallDir,
            2 => LogLocation::WorkingDir,
            3 => LogLocation::UniqueFile,
            4 => LogLocation::Stdout,
            _ => return None,
        })
    }

    pub fn code(self) -> i64 {
        match self {
            LogLocation::None => 0,
            LogLocation::InstallDir => 1,
            LogLocation::WorkingDir => 2,
            LogLocation::UniqueFile => 3,
            LogLocation::Stdout => 4,
        }
    }
}

/// Concrete log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    File(PathBuf),
    Stdout,
}

/// Map a location to a destination. `port` and `now` only feed unique names.
pub fn log_destination(
    location: LogLocation,
    host: &HostContext,
    port: u16,
    now: DateTime<Local>,
) -> Option<LogDestination> {
    let name = &host.process_name;
    match location {
        LogLocation::None => None,
        LogLocation::InstallDir => Some(LogDestination::File(
            host.install_dir.join(format!("debug-{}.log", name)),
        )),
        LogLocation::WorkingDir => Some(LogDestination::File(
            host.cwd.join(format!("debug-{}.log", name)),
        )),
        LogLocation::UniqueFile => Some(LogDestination::File(host.cwd.join(format!(
            "debug-{}-{}-{}.log",
            port,
            name,
            now.format("%Y%m%d-%H%M%S-%6f")
        )))),
        LogLocation::Stdout => Some(LogDestination::Stdout),
    }
}

static INSTALLED: parking_lot::Mutex<Option<LogDestination>> = parking_lot::const_mutex(None);

/// Destination of the installed subscriber, if any.
pub fn installed_destination() -> Option<LogDestination> {
    INSTALLED.lock().clone()
}

/// Install the global subscriber writing to `destination`.
///
/// Returns `false` without touching anything when a destination is already
/// installed.
pub fn install(destination: &LogDestination) -> Result<bool> {
    let mut installed = INSTALLED.lock();
    if installed.is_some() {
        return Ok(false);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match destination {
        LogDestination::Stdout => registry
            .with(fmt::layer().with_thread_names(true).with_writer(std::io::stdout))
            .try_init(),
        LogDestination::File(path) => {
            let (dir, name) = match (path.parent(), path.file_name()) {
                (Some(dir), Some(name)) => (dir, name),
                _ => return Err(Error::Logging(format!("not a file path: {}", path.display()))),
            };
            // Start each run with an empty log
            File::create(path)?;
            let appender = tracing_appender::rolling::never(dir, name);
            registry
                .with(
                    fmt::layer()
                        .with_thread_names(true)
                        .with_ansi(false)
                        .with_writer(appender),
                )
                .try_init()
        }
    };
    result.map_err(|e| Error::Logging(e.to_string()))?;

    *installed = Some(destination.clone());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn host() -> HostContext {
        HostContext::new("/work", "/opt/px")
    }

    #[test]
    fn test_location_codes() {
        for code in 0..=4 {
            assert_eq!(LogLocation::from_code(code).unwrap().code(), code);
        }
        assert_eq!(LogLocation::from_code(5), None);
        assert_eq!(LogLocation::from_code(-1), None);
    }

    #[test]
    fn test_destinations() {
        let now = Local::now();
        assert_eq!(log_destination(LogLocation::None, &host(), 3128, now), None);
        assert_eq!(
            log_destination(LogLocation::InstallDir, &host(), 3128, now),
            Some(LogDestination::File(PathBuf::from("/opt/px/debug-main.log")))
        );
        assert_eq!(
            log_destination(LogLocation::WorkingDir, &host().with_process_name("quit"), 3128, now),
            Some(LogDestination::File(PathBuf::from("/work/debug-quit.log")))
        );
        assert_eq!(
            log_destination(LogLocation::Stdout, &host(), 3128, now),
            Some(LogDestination::Stdout)
        );
    }

    #[test]
    fn test_unique_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let Some(LogDestination::File(path)) =
            log_destination(LogLocation::UniqueFile, &host(), 3129, now)
        else {
            panic!("expected a file destination");
        };
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("debug-3129-main-20240309-140507-"));
        assert!(name.ends_with(".log"));
    }
}
