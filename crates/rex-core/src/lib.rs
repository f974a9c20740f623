//! # REX Core
//!
//! The deterministic Staging Engine behind the REX editing workflow.
//!
//! An editor forks a published item into a draft, edits the draft under
//! optimistic concurrency control, and publishes it back over the original.
//! When the original has been trashed it is restored first; when it has been
//! hard-deleted the draft is promoted in place instead.
//!
//! ```text
//!   publish(10) ──fork──► draft(11, original=10) ──save──► draft(11')
//!        ▲                                                    │
//!        └──────────────────── publish(11) ───────────────────┘
//!                         (11 is trashed, 10 carries 11's content)
//! ```
//!
//! ## Layout
//!
//! - [`content`]: content items, statuses, post types, save patches
//! - [`auth`]: capabilities and the permission gate
//! - [`store`]: the [`ContentStore`] trait and the in-memory store
//! - [`storage`]: the redb-backed store
//! - [`formats`]: snapshot encoding for export/import
//! - [`staging`]: Fork, Save and Publish
//!
//! This crate has no async and no I/O beyond the redb file. The HTTP server
//! and CLI live in `apps/rex`.

pub mod auth;
pub mod content;
pub mod error;
pub mod formats;
pub mod primitives;
pub mod staging;
pub mod storage;
pub mod store;

pub use auth::{Action, Authorizer, Caller, Capability, CapabilityScope, CapabilitySet};
pub use content::{ContentItem, ContentPatch, PostStatus, PostType};
pub use error::RexError;
pub use primitives::{ModifiedGmt, PostId, TermId, UserId};
pub use staging::{
    DeleteOutcome, ForkOutcome, PublishOutcome, SaveOutcome, SaveReason, SaveRequest,
};
pub use storage::RedbStore;
pub use store::{ContentStore, MemoryStore, SerializableStore};
