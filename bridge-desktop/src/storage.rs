//! File-backed Session Storage
//!
//! One JSON object per origin, stored under the user data directory.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SessionStorage,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const APP_DIR: &str = "spotify-profile";

/// `SessionStorage` that keeps every key of one origin in a single JSON file.
///
/// Writes go through a temp file and a rename so a crash never leaves a
/// half-written record behind.
pub struct FileSessionStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSessionStorage {
    /// Storage for `origin` in the platform data directory
    pub fn for_origin(origin: &str) -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR);

        Self::in_directory(data_dir, origin)
    }

    /// Storage for `origin` inside a caller-chosen directory
    pub fn in_directory(dir: impl Into<PathBuf>, origin: &str) -> Self {
        let file_name = format!("{}.json", sanitize_origin(origin));
        Self {
            path: dir.into().join(file_name),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            warn!(path = ?self.path, error = %e, "Session storage file is not valid JSON");
            BridgeError::OperationFailed(format!("Unreadable session storage file: {}", e))
        })
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let encoded = serde_json::to_vec_pretty(map).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode session storage: {}", e))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        // A damaged file only loses its other keys; the new value still lands.
        let mut map = self.read_map().await.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await?;
        debug!(key, path = ?self.path, "Stored session value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, damaged) = match self.read_map().await {
            Ok(map) => (map, false),
            Err(BridgeError::OperationFailed(_)) => (BTreeMap::new(), true),
            Err(e) => return Err(e),
        };

        if map.remove(key).is_none() && !damaged {
            return Ok(());
        }

        if map.is_empty() {
            match fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BridgeError::Io(e)),
            }
        } else {
            self.write_map(&map).await?;
        }

        debug!(key, "Removed session value");
        Ok(())
    }
}

/// Turn an origin such as `http://localhost:3000` into a file-name stem.
fn sanitize_origin(origin: &str) -> String {
    let trimmed = origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    let stem: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();

    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}
