//! Session Storage using the OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SessionStorage,
};
use keyring::Entry;
use tracing::{debug, error};

/// Keyring-based `SessionStorage`
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager (DPAPI)
/// - Linux: Secret Service (libsecret)
///
/// Each origin maps to its own keyring service, each key to one entry.
/// Values are stored base64-encoded.
pub struct KeyringSessionStorage {
    service_name: String,
}

impl KeyringSessionStorage {
    /// Storage scoped to `origin`
    pub fn for_origin(origin: &str) -> Self {
        Self {
            service_name: format!("spotify-profile:{}", origin.trim_end_matches('/')),
        }
    }

    /// Storage under an explicit keyring service name
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn get_entry(&self, key: &str) -> std::result::Result<Entry, keyring::Error> {
        Entry::new(&self.service_name, key)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        BridgeError::OperationFailed(format!("Keyring error: {}", e))
    }
}

#[async_trait]
impl SessionStorage for KeyringSessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    error!(key, error = %e, "Failed to decode keyring value");
                    BridgeError::OperationFailed(format!("Failed to decode value: {}", e))
                })?;
                let value = String::from_utf8(decoded).map_err(|e| {
                    BridgeError::OperationFailed(format!("Keyring value is not UTF-8: {}", e))
                })?;

                debug!(key, "Retrieved session value from keyring");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key, "Session value not found in keyring");
                Ok(None)
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let encoded = STANDARD.encode(value.as_bytes());
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        entry
            .set_password(&encoded)
            .map_err(Self::map_keyring_error)?;

        debug!(key, "Stored session value in keyring");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.delete_credential() {
            Ok(()) => {
                debug!(key, "Deleted session value from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}
