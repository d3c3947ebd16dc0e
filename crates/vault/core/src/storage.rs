//! Storage collaborator: where committed snapshots go.

use crate::error::{VaultError, VaultResult};
use crate::journal::JournalEntry;
use crate::state::LedgerState;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageConfig {
    /// Keep everything in process memory only.
    #[default]
    Memory,
    /// Persist a JSON snapshot after every operation and hydrate it on open.
    File { path: PathBuf },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
        }
    }

    pub fn open(self) -> Box<dyn StateStore> {
        match self {
            Self::Memory => Box::new(MemoryStore::default()),
            Self::File { path } => Box::new(FileStore::new(path)),
        }
    }
}

/// Snapshot as it is written: committed journal followed by the entry of the
/// operation being persisted.
#[derive(Serialize)]
pub struct SnapshotRef<'a> {
    pub format_version: u32,
    pub state: &'a LedgerState,
    pub journal: JournalView<'a>,
}

pub struct JournalView<'a> {
    pub committed: &'a [JournalEntry],
    pub pending: Option<&'a JournalEntry>,
}

impl Serialize for JournalView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.committed.iter().chain(self.pending))
    }
}

/// Snapshot as it is read back.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub state: LedgerState,
    pub journal: Vec<JournalEntry>,
}

/// Durable home for ledger snapshots.
///
/// `persist` runs before an operation commits; an error aborts the operation.
pub trait StateStore: Send {
    fn label(&self) -> &'static str;

    fn load(&self) -> VaultResult<Option<Snapshot>>;

    fn persist(&mut self, snapshot: &SnapshotRef<'_>) -> VaultResult<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    persisted: u64,
}

impl MemoryStore {
    pub fn persisted(&self) -> u64 {
        self.persisted
    }
}

impl StateStore for MemoryStore {
    fn label(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> VaultResult<Option<Snapshot>> {
        Ok(None)
    }

    fn persist(&mut self, _snapshot: &SnapshotRef<'_>) -> VaultResult<()> {
        self.persisted += 1;
        Ok(())
    }
}

/// JSON snapshot file, replaced atomically on every persist.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn label(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> VaultResult<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::Integrity(format!("unreadable snapshot: {e}")))?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(VaultError::Integrity(format!(
                "unsupported snapshot format version {}",
                snapshot.format_version
            )));
        }
        Ok(Some(snapshot))
    }

    fn persist(&mut self, snapshot: &SnapshotRef<'_>) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}
