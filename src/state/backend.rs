//! Durable storage backends for the schedule store

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// A durable key/value map with flush-then-readable semantics.
///
/// `persist` must only return `Ok` once the whole map is durable; a failure
/// must leave the previously persisted map intact.
///
/// Both calls are synchronous and are made from async commands while the
/// store lock is held. Writes happen a few times per interval, so the
/// blocking file I/O is not moved onto a blocking pool.
pub trait StorageBackend: Send + Sync {
    /// Load the stored map, `None` if nothing was ever written
    fn load(&self) -> StoreResult<Option<Map<String, Value>>>;

    /// Replace the stored map as one unit
    fn persist(&self, map: &Map<String, Value>) -> StoreResult<()>;
}

/// Stores the map as a single JSON object file, replaced atomically
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(format!(".tmp.{}", std::process::id()));
        self.path.with_file_name(name)
    }

    /// Flush the directory entry so the rename itself survives a crash
    #[cfg(unix)]
    fn sync_parent(&self) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| StoreError::io(dir, e))
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> StoreResult<Option<Map<String, Value>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, using defaults", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                warn!("State file {} is not a JSON object, starting from defaults", self.path.display());
                Ok(None)
            }
        }
    }

    fn persist(&self, map: &Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(map)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(&json).map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::io(&self.path, e)
        })?;
        self.sync_parent()
    }
}

/// In-memory backend for ephemeral runs and tests.
///
/// Clones share the same storage, so a test can keep a handle to inspect
/// the persisted map or to simulate an outage.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    map: Mutex<Option<Map<String, Value>>>,
    available: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_map(None)
    }

    /// Start from a previously persisted map
    pub fn with_map(map: Option<Map<String, Value>>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                map: Mutex::new(map),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Toggle a simulated storage outage
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// The last persisted map
    pub fn stored(&self) -> Option<Map<String, Value>> {
        self.inner.map.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory backend is offline".to_string()))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> StoreResult<Option<Map<String, Value>>> {
        self.check_available()?;
        Ok(self.stored())
    }

    fn persist(&self, map: &Map<String, Value>) -> StoreResult<()> {
        self.check_available()?;
        *self.inner.map.lock().unwrap_or_else(|e| e.into_inner()) = Some(map.clone());
        Ok(())
    }
}
