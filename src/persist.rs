//! Durable key-value persistence for the token store
//!
//! The store is written under a single versioned key (`tokens-v2` by
//! default) as a schema envelope. Loading runs the migrator, so legacy
//! payloads and corrupt entries both come back as a usable store.
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TokenError};
use crate::migrate::{decode, encode_envelope, MigrationReport, PayloadShape};
use crate::store::TokenStore;

/// Default storage key for the current schema
pub const STORAGE_KEY: &str = "tokens-v2";

/// Minimal durable key-value entry API
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

// ── In-memory ──────────────────────────────────────────────────────────

/// Volatile storage (tests, previews)
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(String::from(key), String::from(value));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ── File-backed ────────────────────────────────────────────────────────

/// One `<key>.json` file per entry inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`, created if missing
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(TokenError::Storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a torn entry
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

// ── Store I/O ──────────────────────────────────────────────────────────

/// Serialize `store` under `key`
pub fn save_store(storage: &mut dyn KeyValueStore, key: &str, store: &TokenStore) -> Result<()> {
    let envelope = encode_envelope(store)?;
    let text = serde_json::to_string(&envelope)?;
    storage.set(key, &text)?;
    debug!(key, bytes = text.len(), "persisted token store");
    Ok(())
}

/// Load and migrate the store under `key`.
///
/// A missing entry yields the built-in store. Unparseable JSON is treated
/// like any other malformed payload: discarded in favour of the defaults.
pub fn load_store(storage: &dyn KeyValueStore, key: &str) -> Result<(TokenStore, MigrationReport)> {
    let Some(text) = storage.get(key)? else {
        debug!(key, "no persisted tokens; starting from built-in store");
        return Ok((
            TokenStore::builtin(),
            MigrationReport::defaults(None, PayloadShape::Unrecognized),
        ));
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(decode(value)),
        Err(err) => {
            warn!(key, %err, "persisted tokens are not valid JSON; using built-in tokens");
            Ok((
                TokenStore::builtin(),
                MigrationReport::defaults(None, PayloadShape::Unrecognized),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Category, Layer, Token, TokenType};

    #[test]
    fn test_memory_save_load() {
        let mut storage = MemoryStorage::new();
        let mut store = TokenStore::new();
        store
            .add_token(Layer::Primitive, Category::Colors, Token::new("red", TokenType::Color, "#F00"))
            .unwrap();
        save_store(&mut storage, STORAGE_KEY, &store).unwrap();
        let (loaded, report) = load_store(&storage, STORAGE_KEY).unwrap();
        assert_eq!(loaded, store);
        assert!(!report.used_defaults);
    }

    #[test]
    fn test_missing_key_gives_builtin() {
        let storage = MemoryStorage::new();
        let (loaded, report) = load_store(&storage, STORAGE_KEY).unwrap();
        assert_eq!(loaded, TokenStore::builtin());
        assert!(report.used_defaults);
    }

    #[test]
    fn test_garbage_json_gives_builtin() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{not json").unwrap();
        let (loaded, report) = load_store(&storage, STORAGE_KEY).unwrap();
        assert_eq!(loaded, TokenStore::builtin());
        assert!(report.used_defaults);
    }

    #[test]
    fn test_persisted_payload_is_envelope() {
        let mut storage = MemoryStorage::new();
        save_store(&mut storage, STORAGE_KEY, &TokenStore::new()).unwrap();
        let text = storage.get(STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schemaVersion"], 2);
        assert!(value["payload"]["primitives"].is_array());
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        let store = TokenStore::builtin();
        save_store(&mut storage, STORAGE_KEY, &store).unwrap();
        assert!(dir.path().join("tokens-v2.json").exists());

        let reopened = FileStorage::open(dir.path()).unwrap();
        let (loaded, _) = load_store(&reopened, STORAGE_KEY).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_file_storage_missing_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.get("absent").unwrap().is_none());
        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert!(storage.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.get("../escape").is_err());
        assert!(storage.get("").is_err());
    }
}
