//! Durable client-local key/value storage.
//!
//! Every key holds one JSON document that is overwritten wholesale on each
//! update. There is no cross-process locking: the store belongs to a single
//! dashboard session.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const TRAIL_KEY: &str = "trail";
pub const GAPS_KEY: &str = "gaps";
pub const METRICS_KEY: &str = "metrics";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage io failure for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("stored value for key {key} is not valid json: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait LocalStore: Send + Sync {
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>>;
    fn save_raw(&self, key: &str, value: &str) -> StoreResult<()>;
}

pub fn load_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> StoreResult<Option<T>> {
    match store.load_raw(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Codec {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })?;
    store.save_raw(key, &raw)
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One `<key>.json` file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl LocalStore for FileStore {
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn save_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;

        // Write-then-rename so a crash never leaves a truncated document.
        let final_path = self.path_for(key);
        let tmp_path = self.root.join(format!(".{key}.json.tmp"));
        {
            let mut writer = BufWriter::new(File::create(&tmp_path).map_err(io_err)?);
            writer.write_all(value.as_bytes()).map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        fs::rename(&tmp_path, &final_path).map_err(io_err)
    }
}

/// Process-local store used by tests and the `--ephemeral` mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise storage-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

impl LocalStore for MemoryStore {
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.values.lock().get(key).cloned())
    }

    fn save_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                key: key.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "writes disabled"),
            });
        }
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
