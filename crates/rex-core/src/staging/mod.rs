//! # Staging Module
//!
//! Fork, Save and Publish: the editing workflow on top of a [`ContentStore`]
//! and a [`Caller`].
//!
//! Every operation takes the store by `&mut` for its whole duration and
//! performs its existence and permission checks before the first write, so a
//! failing call leaves the store untouched. Callers wrap each call in one
//! unit of work (a redb write transaction or a locked in-memory store).
//!
//! [`ContentStore`]: crate::ContentStore
//! [`Caller`]: crate::Caller

mod fork;
mod items;
mod publish;
mod save;

pub use fork::{fork, root_original};
pub use items::{delete, read};
pub use publish::publish;
pub use save::save;

use crate::{ContentItem, ContentPatch, PostId, PostStatus, PostType};
use serde::{Deserialize, Serialize};

// =============================================================================
// REQUESTS
// =============================================================================

/// Input of a Save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRequest {
    /// Target item; `None` creates a new one.
    pub id: Option<PostId>,
    /// Type of a newly created item. Ignored when `id` is set.
    pub post_type: PostType,
    pub patch: ContentPatch,
    /// `modified_gmt` as last read by the client. Empty counts as absent.
    pub expected_modified_gmt: Option<String>,
}

impl SaveRequest {
    /// Save into an existing item.
    #[must_use]
    pub fn update(id: PostId, patch: ContentPatch) -> Self {
        Self {
            id: Some(id),
            patch,
            ..Self::default()
        }
    }

    /// Create a new item of `post_type`.
    #[must_use]
    pub fn create(post_type: PostType, patch: ContentPatch) -> Self {
        Self {
            post_type,
            patch,
            ..Self::default()
        }
    }

    /// Attach the concurrency token.
    #[must_use]
    pub fn expecting(mut self, token: impl Into<String>) -> Self {
        self.expected_modified_gmt = Some(token.into());
        self
    }

    fn token(&self) -> Option<&str> {
        self.expected_modified_gmt
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a Fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkOutcome {
    pub id: PostId,
    pub status: PostStatus,
    pub original_post_id: Option<PostId>,
    pub modified_gmt: String,
}

impl From<&ContentItem> for ForkOutcome {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            status: item.status,
            original_post_id: item.original,
            modified_gmt: item.modified_gmt.to_string(),
        }
    }
}

/// Why a Save wrote to a new item instead of the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    /// The client's token no longer matched the stored version.
    Conflict,
}

/// Result of a Save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub id: PostId,
    pub status: PostStatus,
    pub saved: bool,
    pub forked: bool,
    pub modified_gmt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<PostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SaveReason>,
}

impl SaveOutcome {
    fn in_place(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            status: item.status,
            saved: true,
            forked: false,
            modified_gmt: item.modified_gmt.to_string(),
            original_post_id: item.original,
            reason: None,
        }
    }

    fn forked(item: &ContentItem, reason: SaveReason) -> Self {
        Self {
            forked: true,
            reason: Some(reason),
            ..Self::in_place(item)
        }
    }
}

/// Result of a Publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// The item now carrying the published content.
    pub published_id: PostId,
    /// Whether the content was swapped into the linked original.
    pub used_original: bool,
}

/// Result of a Delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub id: PostId,
    /// `true` for a hard delete, `false` when the item went to the trash.
    pub deleted: bool,
    /// Status before the call.
    pub previous_status: PostStatus,
}

// =============================================================================
// TEST FIXTURES
// =============================================================================
