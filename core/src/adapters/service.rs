//! Start-at-login registration.
//!
//! Windows only: the per-user `Run` registry key. Other platforms leave
//! this to their own service managers.

use crate::error::{Error, Result};
use crate::ports::ServiceInstaller;

/// Value name under the `Run` key.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
const RUN_VALUE: &str = "Px";

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

#[derive(Debug, Default)]
pub struct SystemServiceInstaller;

impl SystemServiceInstaller {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "windows")]
impl SystemServiceInstaller {
    fn reg(&self, args: &[&str]) -> Result<()> {
        let output = std::process::Command::new("reg").args(args).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[cfg(target_os = "windows")]
impl ServiceInstaller for SystemServiceInstaller {
    fn install(&self, command: &str) -> Result<()> {
        self.reg(&["add", RUN_KEY, "/v", RUN_VALUE, "/t", "REG_SZ", "/d", command, "/f"])?;
        tracing::info!(command = command, "Registered to start at login");
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        self.reg(&["delete", RUN_KEY, "/v", RUN_VALUE, "/f"])?;
        tracing::info!("Removed start at login registration");
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl ServiceInstaller for SystemServiceInstaller {
    fn install(&self, _command: &str) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "--install is only available on Windows".to_string(),
        ))
    }

    fn uninstall(&self) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "--uninstall is only available on Windows".to_string(),
        ))
    }
}

#[cfg(all(test, not(target_os = "windows")))]
mod tests {
    use super::*;

    #[test]
    fn test_install_unsupported() {
        let installer = SystemServiceInstaller::new();
        assert!(matches!(
            installer.install("px"),
            Err(Error::UnsupportedPlatform(_))
        ));
        assert!(installer.uninstall().is_err());
    }
}
