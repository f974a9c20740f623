//! redb-backed content store.
//!
//! Items are postcard-encoded under their id; the id allocator and the
//! logical clock live in a small counters table. Every engine operation runs
//! inside one [`RedbTxn`]: redb admits a single writer at a time, so the
//! read-compare-write of a Save cannot interleave with another Save, and an
//! operation that fails is rolled back as a whole.

use crate::store::{ContentStore, SerializableStore};
use crate::{ContentItem, ModifiedGmt, PostId, RexError};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::{Path, PathBuf};

const ITEMS: TableDefinition<u64, &[u8]> = TableDefinition::new("items");
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Counter key: next id to assign.
const NEXT_ID: &str = "next_id";
/// Counter key: last stamp handed out by the logical clock.
const CLOCK: &str = "clock";

fn encode(item: &ContentItem) -> Result<Vec<u8>, RexError> {
    postcard::to_allocvec(item).map_err(|e| RexError::Format(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<ContentItem, RexError> {
    postcard::from_bytes(bytes).map_err(|e| RexError::Format(e.to_string()))
}

// =============================================================================
// DATABASE HANDLE
// =============================================================================

/// A redb database holding content items.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbStore {
    /// Open the database at `path`, creating it (and its tables) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RexError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(RexError::storage)?;

        // Materialise both tables so read transactions never see them missing
        let txn = db.begin_write().map_err(RexError::storage)?;
        {
            txn.open_table(ITEMS).map_err(RexError::storage)?;
            txn.open_table(COUNTERS).map_err(RexError::storage)?;
        }
        txn.commit().map_err(RexError::storage)?;

        Ok(Self { db, path })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a write transaction. Blocks while another writer is active.
    pub fn begin(&self) -> Result<RedbTxn, RexError> {
        let txn = self.db.begin_write().map_err(RexError::storage)?;
        Ok(RedbTxn { txn })
    }

    /// Run `op` in one write transaction: committed if it succeeds,
    /// aborted if it fails.
    pub fn transact<T>(
        &self,
        op: impl FnOnce(&mut RedbTxn) -> Result<T, RexError>,
    ) -> Result<T, RexError> {
        let mut txn = self.begin()?;
        match op(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.abort()?;
                Err(err)
            }
        }
    }

    /// Read one item outside any write transaction.
    pub fn get(&self, id: PostId) -> Result<Option<ContentItem>, RexError> {
        let txn = self.db.begin_read().map_err(RexError::storage)?;
        let table = txn.open_table(ITEMS).map_err(RexError::storage)?;
        let guard = table.get(id.0).map_err(RexError::storage)?;
        guard.map(|bytes| decode(bytes.value())).transpose()
    }

    /// Number of stored items.
    pub fn len(&self) -> Result<usize, RexError> {
        let txn = self.db.begin_read().map_err(RexError::storage)?;
        let table = txn.open_table(ITEMS).map_err(RexError::storage)?;
        let len = table.len().map_err(RexError::storage)?;
        Ok(len as usize)
    }

    /// Whether the database holds no items.
    pub fn is_empty(&self) -> Result<bool, RexError> {
        self.len().map(|len| len == 0)
    }

    /// Consistent copy of every item plus the real counters.
    pub fn snapshot(&self) -> Result<SerializableStore, RexError> {
        let txn = self.db.begin_read().map_err(RexError::storage)?;

        let mut items = Vec::new();
        {
            let table = txn.open_table(ITEMS).map_err(RexError::storage)?;
            for entry in table.iter().map_err(RexError::storage)? {
                let (_, bytes) = entry.map_err(RexError::storage)?;
                items.push(decode(bytes.value())?);
            }
        }

        let counters = txn.open_table(COUNTERS).map_err(RexError::storage)?;
        let next_id = counters
            .get(NEXT_ID)
            .map_err(RexError::storage)?
            .map(|v| v.value())
            .unwrap_or(1);
        let clock = counters
            .get(CLOCK)
            .map_err(RexError::storage)?
            .map(|v| v.value())
            .unwrap_or(0);

        Ok(SerializableStore {
            items,
            next_id,
            clock,
        })
    }

    /// Load a snapshot into an empty database, preserving ids and stamps.
    pub fn restore(&self, snapshot: &SerializableStore) -> Result<(), RexError> {
        self.transact(|txn| {
            if !txn.is_empty()? {
                return Err(RexError::InvalidInput(String::from(
                    "refusing to import into a non-empty database",
                )));
            }
            let mut next_id = snapshot.next_id.max(1);
            let mut clock = snapshot.clock;
            for item in &snapshot.items {
                txn.put(item)?;
                next_id = next_id.max(item.id.0.saturating_add(1));
                clock = clock.max(item.modified_gmt.0);
            }
            txn.set_counter(NEXT_ID, next_id)?;
            txn.set_counter(CLOCK, clock)
        })
    }
}

// =============================================================================
// WRITE TRANSACTION
// =============================================================================

/// One redb write transaction, usable as a [`ContentStore`].
pub struct RedbTxn {
    txn: WriteTransaction,
}

impl RedbTxn {
    /// Make every write of this transaction durable.
    pub fn commit(self) -> Result<(), RexError> {
        self.txn.commit().map_err(RexError::storage)
    }

    /// Discard every write of this transaction.
    pub fn abort(self) -> Result<(), RexError> {
        self.txn.abort().map_err(RexError::storage)
    }

    fn counter(&self, key: &str, initial: u64) -> Result<u64, RexError> {
        let table = self.txn.open_table(COUNTERS).map_err(RexError::storage)?;
        let value = table
            .get(key)
            .map_err(RexError::storage)?
            .map(|v| v.value())
            .unwrap_or(initial);
        Ok(value)
    }

    fn set_counter(&self, key: &str, value: u64) -> Result<(), RexError> {
        let mut table = self.txn.open_table(COUNTERS).map_err(RexError::storage)?;
        table.insert(key, value).map_err(RexError::storage)?;
        Ok(())
    }

    fn allocate_id(&self) -> Result<PostId, RexError> {
        let next = self.counter(NEXT_ID, 1)?;
        self.set_counter(NEXT_ID, next.saturating_add(1))?;
        Ok(PostId(next))
    }

    fn tick(&self) -> Result<ModifiedGmt, RexError> {
        let stamp = self.counter(CLOCK, 0)?.saturating_add(1);
        self.set_counter(CLOCK, stamp)?;
        Ok(ModifiedGmt(stamp))
    }

    fn put(&self, item: &ContentItem) -> Result<(), RexError> {
        let bytes = encode(item)?;
        let mut table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        table
            .insert(item.id.0, bytes.as_slice())
            .map_err(RexError::storage)?;
        Ok(())
    }

    fn contains(&self, id: PostId) -> Result<bool, RexError> {
        let table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        let found = table.get(id.0).map_err(RexError::storage)?.is_some();
        Ok(found)
    }
}

impl ContentStore for RedbTxn {
    fn get(&self, id: PostId) -> Result<Option<ContentItem>, RexError> {
        let table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        let guard = table.get(id.0).map_err(RexError::storage)?;
        guard.map(|bytes| decode(bytes.value())).transpose()
    }

    fn insert(&mut self, mut item: ContentItem) -> Result<ContentItem, RexError> {
        item.id = self.allocate_id()?;
        item.modified_gmt = self.tick()?;
        self.put(&item)?;
        Ok(item)
    }

    fn update(&mut self, mut item: ContentItem) -> Result<ContentItem, RexError> {
        if !self.contains(item.id)? {
            return Err(RexError::NotFound(item.id));
        }
        item.modified_gmt = self.tick()?;
        self.put(&item)?;
        Ok(item)
    }

    fn remove(&mut self, id: PostId) -> Result<Option<ContentItem>, RexError> {
        let mut table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        let removed = table.remove(id.0).map_err(RexError::storage)?;
        removed.map(|bytes| decode(bytes.value())).transpose()
    }

    fn ids(&self) -> Result<Vec<PostId>, RexError> {
        let table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(RexError::storage)? {
            let (key, _) = entry.map_err(RexError::storage)?;
            ids.push(PostId(key.value()));
        }
        Ok(ids)
    }

    fn len(&self) -> Result<usize, RexError> {
        let table = self.txn.open_table(ITEMS).map_err(RexError::storage)?;
        let len = table.len().map_err(RexError::storage)?;
        Ok(len as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
