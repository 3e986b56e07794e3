//! Credential store backed by the platform keyring.
//!
//! - Linux: Secret Service
//! - macOS: login keychain
//! - Windows: Credential Manager

use keyring::Entry;

use crate::error::{Error, Result};
use crate::ports::CredentialStore;

/// Stores secrets through the `keyring` crate.
#[derive(Debug, Default)]
pub struct SystemCredentialStore;

impl SystemCredentialStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(service: &str, account: &str) -> Result<Entry> {
        Entry::new(service, account).map_err(credential_error)
    }
}

impl CredentialStore for SystemCredentialStore {
    fn set_password(&self, service: &str, account: &str, password: &str) -> Result<()> {
        Self::entry(service, account)?
            .set_password(password)
            .map_err(credential_error)
    }

    fn get_password(&self, service: &str, account: &str) -> Result<Option<String>> {
        match Self::entry(service, account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(credential_error(e)),
        }
    }
}

fn credential_error(e: keyring::Error) -> Error {
    Error::Credential(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyring_errors_map_to_credential() {
        let err = credential_error(keyring::Error::NoEntry);
        assert!(matches!(err, Error::Credential(_)));
        assert!(err.to_string().starts_with("Credential store error:"));
    }
}
