use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service the console files its passwords under.
const KEYCHAIN_SERVICE: &str = "smartcondo";

/// Administrator passwords kept in the OS keychain, one entry per username.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(KEYCHAIN_SERVICE, username)
            .with_context(|| format!("Failed to open keychain entry for {}", username))
    }

    pub fn store(username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Saved password for `username`, or `None` when nothing is saved.
    pub fn password(username: &str) -> Result<Option<String>> {
        match Self::entry(username)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    /// Drop the saved password. Returns false if there was none.
    pub fn forget(username: &str) -> Result<bool> {
        match Self::entry(username)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to delete password from keychain"),
        }
    }
}
