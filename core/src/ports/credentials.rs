//! Credential store port (interface).

use crate::error::Result;

/// Port for the OS secret store, keyed by service and account name.
pub trait CredentialStore {
    fn set_password(&self, service: &str, account: &str, password: &str) -> Result<()>;

    fn get_password(&self, service: &str, account: &str) -> Result<Option<String>>;
}
