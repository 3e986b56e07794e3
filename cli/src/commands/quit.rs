//! Quit command - stop other running Px instances.

use std::io;

use anyhow::Result;
use px_core::adapters::SystemProcessTable;
use px_core::{LifecycleService, SelfIdentity};

/// Returns whether no other instance is left running.
pub fn run() -> Result<bool> {
    let service = LifecycleService::new(SystemProcessTable::new(), SelfIdentity::current()?);
    let quiet = service.quit(false, &mut io::stdout())?;
    Ok(quiet)
}
