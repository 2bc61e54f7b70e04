//! Session Storage Abstraction
//!
//! Durable, origin-scoped key/value storage for the persisted session record.

use async_trait::async_trait;

use crate::error::Result;

/// Origin-scoped durable key/value store
///
/// Values survive process restarts (or page reloads on the web). Each
/// implementation is bound to a single origin/namespace at construction, so
/// keys only need to be unique within the application.
///
/// - Desktop: JSON file in the user data directory, or the OS keychain
/// - Web: `localStorage`
///
/// # Security
///
/// The session record contains a refresh token. Implementations must not log
/// stored values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SessionStorage;
///
/// async fn has_session(storage: &dyn SessionStorage) -> Result<bool> {
///     Ok(storage.get("spotify_session").await?.is_some())
/// }
/// ```
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
