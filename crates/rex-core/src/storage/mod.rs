//! # Storage Module
//!
//! Disk-backed content storage using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (one write transaction per engine operation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)

mod redb_store;

pub use redb_store::{RedbStore, RedbTxn};
