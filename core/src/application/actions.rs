//! One-shot command actions: password storage and login registration.

use std::path::Path;

use crate::error::{Error, Result};
use crate::ports::{CredentialStore, ServiceInstaller};

/// Service name credentials are stored under.
pub const CREDENTIAL_SERVICE: &str = "Px";

/// Store the upstream password for `username` and read it back.
pub fn store_password(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<()> {
    if username.is_empty() {
        return Err(Error::MissingUsername);
    }

    store.set_password(CREDENTIAL_SERVICE, username, password)?;
    match store.get_password(CREDENTIAL_SERVICE, username)? {
        Some(saved) if saved.trim_end_matches(['\r', '\n']) == password => {
            tracing::info!(username, "Saved password");
            Ok(())
        }
        _ => Err(Error::Credential(format!(
            "password for {} could not be read back",
            username
        ))),
    }
}

/// Command line registered to start Px at login.
pub fn launch_command(exe: &Path, args: &[String]) -> String {
    let mut parts = vec![quote(&exe.to_string_lossy())];
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') && !arg.starts_with('"') {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Register Px to start at login.
pub fn install(installer: &dyn ServiceInstaller, exe: &Path, args: &[String]) -> Result<()> {
    let command = launch_command(exe, args);
    installer.install(&command)?;
    tracing::info!(command = %command, "Installed Px to start at login");
    Ok(())
}

pub fn uninstall(installer: &dyn ServiceInstaller) -> Result<()> {
    installer.uninstall()?;
    tracing::info!("Uninstalled Px");
    Ok(())
}
