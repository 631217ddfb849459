use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::io::lock::LockError;
use crate::model::plan::PlanCollection;

const PLANS_FILE: &str = "plans.json";
const REMINDERS_FILE: &str = "reminders.json";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "DAYPLAN_DIR";

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no data directory available: set DAYPLAN_DIR or pass -C")]
    NoDataDir,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not serialize plans: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not parse config.toml: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    ConfigEdit(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

/// Persistence seam for the plan store: the plan collection plus the ledger
/// of scheduled reminder handles, as two independent entries.
pub trait PlanStorage {
    /// Load the whole collection. Missing or unreadable-as-JSON data loads
    /// as an empty collection.
    fn load(&self) -> Result<PlanCollection, StoreError>;
    /// Replace the whole collection
    fn save(&self, plans: &PlanCollection) -> Result<(), StoreError>;
    fn load_reminder_handles(&self) -> Vec<String>;
    fn save_reminder_handles(&self, handles: &[String]) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Resolve the data directory: explicit override, then `DAYPLAN_DIR`,
/// then the platform data dir.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, StoreError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("dayplan"))
        .ok_or(StoreError::NoDataDir)
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON file storage
// ---------------------------------------------------------------------------

/// Plans in `plans.json`, reminder handles in `reminders.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn plans_path(&self) -> PathBuf {
        self.dir.join(PLANS_FILE)
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.dir.join(REMINDERS_FILE)
    }
}

impl PlanStorage for FileStorage {
    fn load(&self) -> Result<PlanCollection, StoreError> {
        let path = self.plans_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PlanCollection::new()),
            Err(e) => return Err(StoreError::ReadError { path, source: e }),
        };
        if content.trim().is_empty() {
            return Ok(PlanCollection::new());
        }
        match serde_json::from_str::<PlanCollection>(&content) {
            Ok(plans) => {
                log::debug!("event=plans_loaded count={}", plans.len());
                Ok(plans)
            }
            Err(e) => {
                // Corrupted: back up and start fresh. Without a backup the
                // next save would destroy the only copy, so refuse to open.
                let bak = path.with_extension("json.bak");
                if let Err(source) = fs::copy(&path, &bak) {
                    log::error!(
                        "event=plans_backup_failed path={} backup={} error={}",
                        path.display(),
                        bak.display(),
                        source
                    );
                    return Err(StoreError::WriteError { path: bak, source });
                }
                log::warn!(
                    "event=plans_load_failed path={} backup={} error={}",
                    path.display(),
                    bak.display(),
                    e
                );
                eprintln!(
                    "warning: could not parse {} (backed up as {}): {}",
                    path.display(),
                    bak.display(),
                    e
                );
                Ok(PlanCollection::new())
            }
        }
    }

    fn save(&self, plans: &PlanCollection) -> Result<(), StoreError> {
        let path = self.plans_path();
        let content = serde_json::to_string_pretty(plans)?;
        atomic_write(&path, content.as_bytes())
            .map_err(|e| StoreError::WriteError { path, source: e })?;
        log::debug!("event=plans_saved count={}", plans.len());
        Ok(())
    }

    fn load_reminder_handles(&self) -> Vec<String> {
        fs::read_to_string(self.reminders_path())
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn save_reminder_handles(&self, handles: &[String]) -> Result<(), StoreError> {
        let path = self.reminders_path();
        let content = serde_json::to_string(handles)?;
        atomic_write(&path, content.as_bytes())
            .map_err(|e| StoreError::WriteError { path, source: e })
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    plans: Option<PlanCollection>,
    handles: Vec<String>,
    saves: usize,
}

/// Storage kept in memory. Clones share the same contents, so a caller can
/// keep a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved collection, if any save happened
    pub fn saved(&self) -> Option<PlanCollection> {
        self.lock().plans.clone()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlanStorage for MemoryStorage {
    fn load(&self) -> Result<PlanCollection, StoreError> {
        Ok(self.lock().plans.clone().unwrap_or_default())
    }

    fn save(&self, plans: &PlanCollection) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.plans = Some(plans.clone());
        inner.saves += 1;
        Ok(())
    }

    fn load_reminder_handles(&self) -> Vec<String> {
        self.lock().handles.clone()
    }

    fn save_reminder_handles(&self, handles: &[String]) -> Result<(), StoreError> {
        self.lock().handles = handles.to_vec();
        Ok(())
    }
}
