//! Password command - store the upstream password in the OS secret store.

use std::io::{self, BufRead};

use anyhow::{bail, Result};
use px_core::adapters::SystemCredentialStore;
use px_core::application::actions;
use px_core::{Error, Resolution};

pub fn run(resolution: &Resolution) -> Result<()> {
    let username = resolution.state.username();
    if username.is_empty() {
        return Err(Error::MissingUsername.into());
    }

    let password = if atty::is(atty::Stream::Stdin) {
        let first = rpassword::prompt_password(format!("Enter password for {}: ", username))?;
        let second = rpassword::prompt_password("Re-enter password: ")?;
        if first != second {
            bail!("Passwords do not match");
        }
        first
    } else {
        read_line()?
    };
    if password.is_empty() {
        bail!("Empty password, nothing saved");
    }

    actions::store_password(&SystemCredentialStore::new(), username, &password)?;
    println!("Saved password for {}", username);
    Ok(())
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
