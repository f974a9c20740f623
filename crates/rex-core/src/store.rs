//! # Content Store
//!
//! The storage seam of the engine.
//!
//! This module defines the `ContentStore` trait and `MemoryStore`, its
//! in-memory implementation. All data structures use `BTreeMap` for
//! deterministic ordering; version tokens come from a logical clock owned by
//! the store, never from the wall clock.

use crate::{ContentItem, ModifiedGmt, PostId, RexError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// CONTENTSTORE TRAIT
// =============================================================================

/// Durable storage of content items.
///
/// The store owns two counters: the next id to assign and the logical clock
/// behind [`ModifiedGmt`]. Every `insert` and `update` advances the clock, so
/// an item's `modified_gmt` strictly increases on every write.
///
/// Engine operations run against one `&mut` store for their whole duration;
/// backends make that borrow a unit of work (a mutex guard, a redb write
/// transaction) so each operation is atomic.
pub trait ContentStore {
    /// Read the live item, if it exists (trashed items exist).
    fn get(&self, id: PostId) -> Result<Option<ContentItem>, RexError>;

    /// Store a new item. The store assigns `id` and `modified_gmt`;
    /// whatever the caller put there is overwritten.
    fn insert(&mut self, item: ContentItem) -> Result<ContentItem, RexError>;

    /// Overwrite an existing item and stamp a fresh `modified_gmt`.
    ///
    /// Fails with `NotFound` if the item is gone.
    fn update(&mut self, item: ContentItem) -> Result<ContentItem, RexError>;

    /// Hard-delete an item, returning it if it existed.
    fn remove(&mut self, id: PostId) -> Result<Option<ContentItem>, RexError>;

    /// All ids in ascending order.
    fn ids(&self) -> Result<Vec<PostId>, RexError>;

    /// Number of stored items.
    fn len(&self) -> Result<usize, RexError>;

    /// Whether the store holds no items.
    fn is_empty(&self) -> Result<bool, RexError> {
        self.len().map(|len| len == 0)
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory content store.
///
/// Used directly by the `file` backend (persisted as a snapshot) and by
/// tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    /// Item storage: PostId -> ContentItem
    items: BTreeMap<PostId, ContentItem>,

    /// Next id to assign (ids start at 1)
    next_id: u64,

    /// Logical clock; last stamp handed out
    clock: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
            clock: 0,
        }
    }
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All items in id order.
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.values()
    }

    /// Next id that would be assigned.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Current reading of the logical clock.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn tick(&mut self) -> ModifiedGmt {
        self.clock = self.clock.saturating_add(1);
        ModifiedGmt(self.clock)
    }
}

impl ContentStore for MemoryStore {
    fn get(&self, id: PostId) -> Result<Option<ContentItem>, RexError> {
        Ok(self.items.get(&id).cloned())
    }

    fn insert(&mut self, mut item: ContentItem) -> Result<ContentItem, RexError> {
        item.id = PostId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        item.modified_gmt = self.tick();
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn update(&mut self, mut item: ContentItem) -> Result<ContentItem, RexError> {
        if !self.items.contains_key(&item.id) {
            return Err(RexError::NotFound(item.id));
        }
        item.modified_gmt = self.tick();
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn remove(&mut self, id: PostId) -> Result<Option<ContentItem>, RexError> {
        Ok(self.items.remove(&id))
    }

    fn ids(&self) -> Result<Vec<PostId>, RexError> {
        Ok(self.items.keys().copied().collect())
    }

    fn len(&self) -> Result<usize, RexError> {
        Ok(self.items.len())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of a store, used by snapshots and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableStore {
    pub items: Vec<ContentItem>,
    pub next_id: u64,
    pub clock: u64,
}

impl SerializableStore {
    /// Capture any store through the trait.
    ///
    /// The counters are derived from the surviving items. Backends that
    /// track their own counters (see `RedbStore::snapshot`) should prefer
    /// those, since ids of hard-deleted items are not visible here.
    pub fn capture<S: ContentStore + ?Sized>(store: &S) -> Result<Self, RexError> {
        let mut items = Vec::new();
        for id in store.ids()? {
            if let Some(item) = store.get(id)? {
                items.push(item);
            }
        }
        let next_id = items
            .iter()
            .map(|item| item.id.0.saturating_add(1))
            .max()
            .unwrap_or(1);
        let clock = items
            .iter()
            .map(|item| item.modified_gmt.0)
            .max()
            .unwrap_or(0);
        Ok(Self {
            items,
            next_id,
            clock,
        })
    }
}

impl From<&MemoryStore> for SerializableStore {
    fn from(store: &MemoryStore) -> Self {
        Self {
            items: store.items.values().cloned().collect(),
            next_id: store.next_id,
            clock: store.clock,
        }
    }
}

impl From<SerializableStore> for MemoryStore {
    fn from(snapshot: SerializableStore) -> Self {
        let mut store = MemoryStore {
            items: BTreeMap::new(),
            next_id: snapshot.next_id.max(1),
            clock: snapshot.clock,
        };

        for item in snapshot.items {
            // Counters must stay ahead of whatever the snapshot carries
            store.next_id = store.next_id.max(item.id.0.saturating_add(1));
            store.clock = store.clock.max(item.modified_gmt.0);
            store.items.insert(item.id, item);
        }

        store
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PostStatus, PostType, UserId};

    fn draft() -> ContentItem {
        ContentItem::new(PostType::post(), PostStatus::Draft, UserId(1))
    }

    #[test]
    fn insert_assigns_sequential_ids() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let a = store.insert(draft())?;
        let b = store.insert(draft())?;

        assert_eq!(a.id, PostId(1));
        assert_eq!(b.id, PostId(2));
        assert_eq!(store.len()?, 2);
        Ok(())
    }

    #[test]
    fn insert_ignores_caller_supplied_id() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let mut item = draft();
        item.id = PostId(500);
        let stored = store.insert(item)?;
        assert_eq!(stored.id, PostId(1));
        Ok(())
    }

    #[test]
    fn update_strictly_advances_modified() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let first = store.insert(draft())?;
        let second = store.update(first.clone())?;
        let third = store.update(second.clone())?;

        assert!(second.modified_gmt > first.modified_gmt);
        assert!(third.modified_gmt > second.modified_gmt);
        assert_eq!(first.id, third.id);
        Ok(())
    }

    #[test]
    fn update_missing_item_fails() {
        let mut store = MemoryStore::new();
        let mut item = draft();
        item.id = PostId(9);
        assert_eq!(store.update(item), Err(RexError::NotFound(PostId(9))));
    }

    #[test]
    fn remove_is_hard_delete() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = store.insert(draft())?;
        assert!(store.remove(item.id)?.is_some());
        assert!(store.get(item.id)?.is_none());
        assert!(store.remove(item.id)?.is_none());
        Ok(())
    }

    #[test]
    fn ids_never_reused_after_delete() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let a = store.insert(draft())?;
        store.remove(a.id)?;
        let b = store.insert(draft())?;
        assert_ne!(a.id, b.id);
        Ok(())
    }

    #[test]
    fn serialization_roundtrip() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        store.insert(draft().with_title("one"))?;
        store.insert(draft().with_title("two"))?;

        let serializable = SerializableStore::from(&store);
        let restored = MemoryStore::from(serializable);

        assert_eq!(store, restored);
        Ok(())
    }

    #[test]
    fn capture_derives_counters() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let a = store.insert(draft())?;
        let b = store.insert(draft())?;
        store.update(a)?;

        let captured = SerializableStore::capture(&store)?;
        assert_eq!(captured.items.len(), 2);
        assert_eq!(captured.next_id, b.id.0 + 1);
        assert_eq!(captured.clock, store.clock());
        Ok(())
    }
}
