//! OS service installer port (interface).

use crate::error::Result;

/// Port for registering the agent to start with the user session.
pub trait ServiceInstaller {
    /// Register `command` to run at login.
    fn install(&self, command: &str) -> Result<()>;

    /// Remove a previous registration.
    fn uninstall(&self) -> Result<()>;
}
