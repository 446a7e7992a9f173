// src/persistence/storage.rs

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::template::permit_steps::is_storage_safe;

/// Per-item ceiling for file-backed storage. Signature images are inline data URIs.
pub const ITEM_MAX_BYTES: u64 = 8 * 1024 * 1024;

const ITEM_EXT: &str = "json";

#[derive(Debug)]
pub enum StorageError {
    InvalidKey(String),
    QuotaExceeded { needed: usize, quota: usize },
    TooLarge { bytes: u64, max: u64 },
    Io(std::io::Error),
    Poisoned,
}

impl StorageError {
    /// Short tag for the save log.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::InvalidKey(_) => "invalid_key",
            StorageError::QuotaExceeded { .. } => "quota",
            StorageError::TooLarge { .. } => "too_large",
            StorageError::Io(_) => "io",
            StorageError::Poisoned => "poisoned",
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidKey(k) => write!(f, "invalid storage key '{k}'"),
            StorageError::QuotaExceeded { needed, quota } => {
                write!(f, "storage quota exceeded: need {needed} bytes, quota {quota}")
            }
            StorageError::TooLarge { bytes, max } => {
                write!(f, "stored item too large: {bytes} > {max}")
            }
            StorageError::Io(e) => write!(f, "storage io error: {e}"),
            StorageError::Poisoned => write!(f, "storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// String key/value store with the shape of browser local storage.
///
/// Each `set_item` replaces the whole value; readers never observe a partial write.
pub trait DraftStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

// ------------------------------------------------------
// in-memory
// ------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    /// Total bytes (keys + values) allowed; None = unlimited.
    quota: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            quota: Mutex::new(Some(quota)),
        }
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        if let Ok(mut q) = self.quota.lock() {
            *q = quota;
        }
    }

    /// Writes raw text under `key`, bypassing quota; used to plant corrupt entries.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
    }
}

impl DraftStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let quota = *self.quota.lock().map_err(|_| StorageError::Poisoned)?;
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;

        if let Some(quota) = quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.keys().cloned().collect())
    }
}

// ------------------------------------------------------
// file-backed
// ------------------------------------------------------

/// One `<key>.json` file per item under `dir`.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.{ITEM_EXT}")))
    }
}

impl DraftStorage for FsStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.item_path(key)?;

        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.len() > ITEM_MAX_BYTES {
            return Err(StorageError::TooLarge {
                bytes: meta.len(),
                max: ITEM_MAX_BYTES,
            });
        }

        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.item_path(key)?;
        if value.len() as u64 > ITEM_MAX_BYTES {
            return Err(StorageError::TooLarge {
                bytes: value.len() as u64,
                max: ITEM_MAX_BYTES,
            });
        }
        fs::create_dir_all(&self.dir)?;
        write_atomic(&path, value.as_bytes())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.item_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let rd = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for entry in rd.flatten() {
            let p = entry.path();
            if p.extension().and_then(|s| s.to_str()) != Some(ITEM_EXT) {
                continue;
            }
            if let Some(stem) = p.file_stem().and_then(|s| s.to_str()) {
                if is_storage_safe(stem) {
                    out.push(stem.to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if is_storage_safe(key) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Same-directory temp file, fsync, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;

    let mut rnd = [0u8; 12];
    OsRng.fill_bytes(&mut rnd);
    let tmp = parent.join(format!(".draft.{}.tmp", hex::encode(rnd)));

    let mut opts = OpenOptions::new();
    opts.create_new(true).write(true);
    #[cfg(unix)]
    {
        opts.mode(0o600);
    }

    let mut f = opts.open(&tmp)?;

    let write_res: Result<(), StorageError> = (|| {
        f.write_all(bytes)?;
        f.flush()?;
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if write_res.is_err() {
        let _ = fs::remove_file(&tmp);
    }

    write_res
}

// ======================================================
// Unit Tests
// ======================================================
