//! Storage backends behind the server and the CLI.
//!
//! - `file`: a [`MemoryStore`] persisted as a snapshot file after every
//!   successful write. Operations run on a working copy that only replaces
//!   the live store once the snapshot is on disk. Every write clones the
//!   whole store and rewrites the whole file, so its cost grows with the
//!   number of items; use `redb` for anything beyond a small site.
//! - `redb`: a [`RedbStore`]; each operation is one write transaction.

use crate::error::AppError;
use rex_core::formats::{decode_snapshot, encode_snapshot};
use rex_core::{ContentStore, MemoryStore, RedbStore, RexError, SerializableStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

/// Which backend a database path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    File,
    Redb,
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(BackendKind::File),
            "redb" => Ok(BackendKind::Redb),
            other => Err(AppError::InvalidArgument(format!(
                "unknown backend '{}' (expected 'file' or 'redb')",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::File => "file",
            BackendKind::Redb => "redb",
        })
    }
}

/// An opened database.
pub enum Backend {
    /// O(items) per write: the store is cloned and the snapshot rewritten.
    File {
        path: PathBuf,
        store: Mutex<MemoryStore>,
    },
    Redb(RedbStore),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            Backend::Redb(store) => f.debug_tuple("Redb").field(store).finish(),
        }
    }
}

impl Backend {
    /// Open `path`. A missing `file` database starts empty and is written on
    /// the first mutation; a missing `redb` database is created.
    pub fn open(path: &Path, kind: BackendKind) -> Result<Self, AppError> {
        match kind {
            BackendKind::File => {
                let store = if path.exists() {
                    load_snapshot(path)?
                } else {
                    MemoryStore::new()
                };
                Ok(Backend::File {
                    path: path.to_path_buf(),
                    store: Mutex::new(store),
                })
            }
            BackendKind::Redb => Ok(Backend::Redb(RedbStore::open(path)?)),
        }
    }

    /// Create a fresh, empty database at `path`.
    pub fn create(path: &Path, kind: BackendKind, force: bool) -> Result<Self, AppError> {
        if path.exists() {
            if !force {
                return Err(AppError::InvalidArgument(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            std::fs::remove_file(path)?;
        }

        match kind {
            BackendKind::File => {
                let store = MemoryStore::new();
                write_snapshot(path, &SerializableStore::from(&store))?;
                Ok(Backend::File {
                    path: path.to_path_buf(),
                    store: Mutex::new(store),
                })
            }
            BackendKind::Redb => Ok(Backend::Redb(RedbStore::open(path)?)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::File { .. } => BackendKind::File,
            Backend::Redb(_) => BackendKind::Redb,
        }
    }

    /// Run `op` as one atomic unit of work.
    ///
    /// On error nothing is written; on success the result is durable before
    /// this returns.
    pub fn transact<T>(
        &self,
        op: impl FnOnce(&mut dyn ContentStore) -> Result<T, RexError>,
    ) -> Result<T, AppError> {
        match self {
            Backend::File { path, store } => {
                let mut live = store.lock().map_err(|_| AppError::lock_poisoned("store"))?;
                let mut working = live.clone();
                let value = op(&mut working)?;
                write_snapshot(path, &SerializableStore::from(&working))?;
                *live = working;
                Ok(value)
            }
            Backend::Redb(store) => Ok(store.transact(|txn| op(txn))?),
        }
    }

    /// Run a read-only `op` against a consistent view.
    pub fn read<T>(
        &self,
        op: impl FnOnce(&dyn ContentStore) -> Result<T, RexError>,
    ) -> Result<T, AppError> {
        match self {
            Backend::File { store, .. } => {
                let live = store.lock().map_err(|_| AppError::lock_poisoned("store"))?;
                Ok(op(&*live)?)
            }
            Backend::Redb(store) => {
                let txn = store.begin()?;
                let result = op(&txn);
                txn.abort()?;
                Ok(result?)
            }
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> Result<usize, AppError> {
        self.read(|store| store.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        self.len().map(|len| len == 0)
    }

    /// Full copy of the database, counters included.
    pub fn snapshot(&self) -> Result<SerializableStore, AppError> {
        match self {
            Backend::File { store, .. } => {
                let live = store.lock().map_err(|_| AppError::lock_poisoned("store"))?;
                Ok(SerializableStore::from(&*live))
            }
            Backend::Redb(store) => Ok(store.snapshot()?),
        }
    }

    /// Load `snapshot` into this database, which must be empty.
    pub fn import(&self, snapshot: SerializableStore) -> Result<(), AppError> {
        match self {
            Backend::File { path, store } => {
                let mut live = store.lock().map_err(|_| AppError::lock_poisoned("store"))?;
                if !live.is_empty()? {
                    return Err(AppError::InvalidArgument(format!(
                        "{} is not empty",
                        path.display()
                    )));
                }
                write_snapshot(path, &snapshot)?;
                *live = MemoryStore::from(snapshot);
                Ok(())
            }
            Backend::Redb(store) => Ok(store.restore(&snapshot)?),
        }
    }
}

fn load_snapshot(path: &Path) -> Result<MemoryStore, AppError> {
    let bytes = std::fs::read(path)?;
    Ok(MemoryStore::from(decode_snapshot(&bytes)?))
}

/// Write via a sibling temp file and rename, so readers never see a torn file.
fn write_snapshot(path: &Path, snapshot: &SerializableStore) -> Result<(), AppError> {
    let bytes = encode_snapshot(snapshot)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_core::{ContentItem, PostStatus, PostType, UserId};

    fn item() -> ContentItem {
        ContentItem::new(PostType::post(), PostStatus::Draft, UserId(1)).with_title("t")
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("file".parse::<BackendKind>().ok(), Some(BackendKind::File));
        assert_eq!("redb".parse::<BackendKind>().ok(), Some(BackendKind::Redb));
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn file_backend_persists_each_write() -> Result<(), AppError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("content.db");
        let backend = Backend::create(&path, BackendKind::File, false)?;
        let stored = backend.transact(|store| store.insert(item()))?;

        let reopened = Backend::open(&path, BackendKind::File)?;
        let read = reopened.read(|store| store.get(stored.id))?;
        assert_eq!(read, Some(stored));
        Ok(())
    }

    #[test]
    fn failed_operation_leaves_file_store_untouched() -> Result<(), AppError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("content.db");
        let backend = Backend::create(&path, BackendKind::File, false)?;

        let result: Result<(), AppError> = backend.transact(|store| {
            store.insert(item())?;
            Err(RexError::InvalidInput("late".into()))
        });
        assert!(result.is_err());
        assert!(backend.is_empty()?);
        assert!(Backend::open(&path, BackendKind::File)?.is_empty()?);
        Ok(())
    }

    #[test]
    fn redb_read_sees_committed_writes() -> Result<(), AppError> {
        let dir = tempfile::tempdir()?;
        let backend = Backend::open(&dir.path().join("content.redb"), BackendKind::Redb)?;
        let stored = backend.transact(|store| store.insert(item()))?;
        assert_eq!(backend.read(|store| store.get(stored.id))?, Some(stored));
        assert_eq!(backend.len()?, 1);
        Ok(())
    }

    #[test]
    fn create_refuses_existing_path_without_force() -> Result<(), AppError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("content.db");
        Backend::create(&path, BackendKind::File, false)?;
        assert!(Backend::create(&path, BackendKind::File, false).is_err());
        assert!(Backend::create(&path, BackendKind::File, true).is_ok());
        Ok(())
    }
}
