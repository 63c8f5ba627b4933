//! # Session Snapshots
//!
//! Durable snapshots of the open-session set. The manager writes one
//! after every mutation and reads it back on boot, so a crash or power
//! cut costs at most the last keystroke, never a whole cart.
//!
//! ## Snapshot Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Snapshot Lifecycle                               │
//! │                                                                         │
//! │  BOOT                                                                   │
//! │  ────                                                                   │
//! │  load() ──► Some(snapshot) ──► restore open sessions + active tab       │
//! │        └──► None (missing / unreadable / old schema) ──► fresh start    │
//! │                                                                         │
//! │  EVERY MUTATION                                                         │
//! │  ──────────────                                                         │
//! │  add line, edit qty, switch tab, ... ──► save(snapshot)                 │
//! │                                          (tmp file + rename)            │
//! │                                                                         │
//! │  FINALIZE / CANCEL                                                      │
//! │  ─────────────────                                                      │
//! │  session leaves the open set ──► save(snapshot without it)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot is a recovery aid, not a source of truth. Committed
//! sales live in the ledger; only in-progress carts live here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use punto_core::Session;

use crate::error::{SnapshotError, SnapshotResult};

/// Current snapshot schema version.
///
/// A snapshot written under a different version is discarded on load
/// rather than migrated. The operator loses open tabs, never committed
/// sales.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Snapshot Payload
// =============================================================================

/// Everything needed to restore the session manager after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Schema version this snapshot was written with.
    pub schema_version: u32,

    /// ID of the session that was active when the snapshot was taken.
    pub active_id: String,

    /// Next value of the auto-label counter ("Venta N").
    pub label_seq: u64,

    /// All open sessions, in tab order.
    pub sessions: Vec<Session>,
}

// =============================================================================
// Snapshot Store Trait
// =============================================================================

/// Persistence backend for session snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Writes a snapshot, replacing any previous one.
    fn save(&self, snapshot: &SessionSnapshot) -> SnapshotResult<()>;

    /// Reads the last written snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot exists, or when the stored
    /// one is unreadable or from another schema version. Those cases
    /// are logged and treated as a fresh start.
    fn load(&self) -> SnapshotResult<Option<SessionSnapshot>>;

    /// Removes the stored snapshot, if any.
    fn clear(&self) -> SnapshotResult<()>;
}

// =============================================================================
// File Store
// =============================================================================

/// JSON-file snapshot store.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSnapshotStore { path: path.into() }
    }

    /// Creates a store at the platform data directory
    /// (e.g. `~/.local/share/pos/sessions.json` on Linux).
    pub fn at_default_path() -> SnapshotResult<Self> {
        default_snapshot_path()
            .map(Self::new)
            .ok_or(SnapshotError::NoDirectory)
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns the default snapshot file path for this platform.
pub fn default_snapshot_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "punto", "pos")
        .map(|dirs| dirs.data_dir().join("sessions.json"))
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> SnapshotResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &contents)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(
            path = ?self.path,
            sessions = snapshot.sessions.len(),
            "Session snapshot written"
        );
        Ok(())
    }

    fn load(&self) -> SnapshotResult<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let snapshot: SessionSnapshot = match serde_json::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Discarding unreadable session snapshot");
                return Ok(None);
            }
        };

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            warn!(
                found = snapshot.schema_version,
                expected = SNAPSHOT_SCHEMA_VERSION,
                "Discarding session snapshot from another schema version"
            );
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    fn clear(&self) -> SnapshotResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory snapshot store for tests and ephemeral terminals.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Option<SessionSnapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> SnapshotResult<()> {
        *self.inner.lock().expect("snapshot mutex poisoned") = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> SnapshotResult<Option<SessionSnapshot>> {
        Ok(self.inner.lock().expect("snapshot mutex poisoned").clone())
    }

    fn clear(&self) -> SnapshotResult<()> {
        *self.inner.lock().expect("snapshot mutex poisoned") = None;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use punto_core::{LineDraft, Money};

    fn sample_snapshot() -> SessionSnapshot {
        let mut session = Session::new("Venta 1");
        session
            .add_line(LineDraft::quick("Gorra", Money::from_pesos(1000), 2))
            .unwrap();
        SessionSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            active_id: session.id.clone(),
            label_seq: 2,
            sessions: vec![session],
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("sessions.json"));

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();

        let restored = store.load().unwrap().unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.sessions[0].lines().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileSnapshotStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_old_schema_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("sessions.json"));

        let mut snapshot = sample_snapshot();
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        store.save(&snapshot).unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("sessions.json"));

        let mut snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        snapshot.label_seq = 9;
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap().unwrap().label_seq, 9);
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("sessions.json"));

        store.save(&sample_snapshot()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());

        // Clearing an empty store is a no-op.
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), snapshot);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
