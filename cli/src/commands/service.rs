//! Install/uninstall commands - start Px at login.

use anyhow::Result;
use px_core::adapters::SystemServiceInstaller;
use px_core::application::actions;

pub fn install(settings: &[(&str, String)]) -> Result<()> {
    let exe = std::env::current_exe()?;
    let args: Vec<String> = settings
        .iter()
        .map(|(name, value)| format!("--{}={}", name, value))
        .collect();
    actions::install(&SystemServiceInstaller::new(), &exe, &args)?;
    println!("Px installed to start at login");
    Ok(())
}

pub fn uninstall() -> Result<()> {
    actions::uninstall(&SystemServiceInstaller::new())?;
    println!("Px uninstalled");
    Ok(())
}
