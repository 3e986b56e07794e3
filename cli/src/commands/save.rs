//! Save command - write resolved settings to the config file.

use anyhow::Result;
use px_core::Resolution;

pub fn run(resolution: &Resolution) -> Result<()> {
    let path = resolution.save()?;
    println!("Saved config to {}\n", path.display());
    print!("{}", resolution.store.to_ini_string());
    Ok(())
}
