//! # Content Module
//!
//! The content item model: statuses, post types, the item itself, and the
//! patch a Save applies to it.

use crate::primitives::is_protected_meta;
use crate::{ModifiedGmt, PostId, RexError, TermId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Longest accepted post type slug.
pub const MAX_POST_TYPE_LEN: usize = 20;

// =============================================================================
// POST STATUS
// =============================================================================

/// Lifecycle status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Publish,
    Private,
    Trash,
}

impl PostStatus {
    /// All statuses, in declaration order.
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Draft,
        PostStatus::Pending,
        PostStatus::Publish,
        PostStatus::Private,
        PostStatus::Trash,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Publish => "publish",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
        }
    }

    /// Published items are world-readable.
    #[must_use]
    pub fn is_published(self) -> bool {
        self == PostStatus::Publish
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = RexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| RexError::invalid(format!("unknown post status '{}'", s)))
    }
}

// =============================================================================
// POST TYPE
// =============================================================================

/// Post type slug (`post`, `page`, or a custom type).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostType(String);

impl PostType {
    #[must_use]
    pub fn post() -> Self {
        Self(String::from("post"))
    }

    #[must_use]
    pub fn page() -> Self {
        Self(String::from("page"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether capabilities for this type are spelled with `_pages`.
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.0 == "page"
    }
}

impl Default for PostType {
    fn default() -> Self {
        Self::post()
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostType {
    type Err = RexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if s.is_empty() || s.len() > MAX_POST_TYPE_LEN || !valid_chars {
            return Err(RexError::invalid(format!("invalid post type '{}'", s)));
        }
        Ok(Self(s.to_string()))
    }
}

// =============================================================================
// CONTENT ITEM
// =============================================================================

/// A unit of content held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Assigned by the store; immutable afterwards.
    pub id: PostId,
    pub post_type: PostType,
    pub status: PostStatus,
    pub author: UserId,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    /// Advanced by the store on every write.
    pub modified_gmt: ModifiedGmt,
    /// Taxonomy name -> assigned term ids.
    pub terms: BTreeMap<String, BTreeSet<TermId>>,
    pub meta: BTreeMap<String, String>,
    /// Root published item this one was forked from.
    pub original: Option<PostId>,
    /// Status held before the item was trashed.
    pub trashed_from: Option<PostStatus>,
}

impl ContentItem {
    /// A blank, not-yet-stored item.
    #[must_use]
    pub fn new(post_type: PostType, status: PostStatus, author: UserId) -> Self {
        Self {
            id: PostId::UNASSIGNED,
            post_type,
            status,
            author,
            title: String::new(),
            content: String::new(),
            excerpt: String::new(),
            slug: String::new(),
            modified_gmt: ModifiedGmt::default(),
            terms: BTreeMap::new(),
            meta: BTreeMap::new(),
            original: None,
            trashed_from: None,
        }
    }

    /// Builder-style title setter.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder-style body setter.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builder-style term assignment.
    #[must_use]
    pub fn with_terms(mut self, taxonomy: impl Into<String>, terms: &[TermId]) -> Self {
        self.terms
            .insert(taxonomy.into(), terms.iter().copied().collect());
        self
    }

    /// Meta entries that may travel between items.
    pub fn public_meta(&self) -> impl Iterator<Item = (&String, &String)> {
        self.meta.iter().filter(|(key, _)| !is_protected_meta(key))
    }

    /// Move the item to the trash, remembering where it came from.
    pub fn trash(&mut self) {
        if self.status != PostStatus::Trash {
            self.trashed_from = Some(self.status);
            self.status = PostStatus::Trash;
        }
    }

    /// Restore a trashed item to the status it held before.
    pub fn untrash(&mut self) {
        if self.status == PostStatus::Trash {
            self.status = self.trashed_from.take().unwrap_or(PostStatus::Draft);
        }
    }

    /// Replace this item's non-protected meta with `source`'s.
    ///
    /// Protected keys on `self` are kept; keys `source` does not carry are
    /// left untouched.
    pub fn replace_public_meta_from(&mut self, source: &ContentItem) {
        for (key, value) in source.public_meta() {
            self.meta.insert(key.clone(), value.clone());
        }
    }
}

// =============================================================================
// CONTENT PATCH
// =============================================================================

/// Client-supplied changes carried by a Save.
///
/// Absent fields leave the item untouched. Meta entries overwrite by key;
/// each taxonomy listed replaces that taxonomy's terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    pub slug: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub terms: BTreeMap<String, BTreeSet<TermId>>,
}

impl ContentPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Drop every field the server owns: all protected (`_`-prefixed)
    /// meta. The original link can only be set through Fork.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.meta.retain(|key, _| !is_protected_meta(key));
        self
    }

    /// Apply the content fields, meta and terms (not the status) to `item`.
    pub fn apply_content(&self, item: &mut ContentItem) {
        if let Some(title) = &self.title {
            item.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            item.content.clone_from(content);
        }
        if let Some(excerpt) = &self.excerpt {
            item.excerpt.clone_from(excerpt);
        }
        if let Some(slug) = &self.slug {
            item.slug.clone_from(slug);
        }
        for (key, value) in &self.meta {
            if !is_protected_meta(key) {
                item.meta.insert(key.clone(), value.clone());
            }
        }
        for (taxonomy, terms) in &self.terms {
            item.terms.insert(taxonomy.clone(), terms.clone());
        }
    }

    /// Apply everything, including the status.
    pub fn apply(&self, item: &mut ContentItem) {
        self.apply_content(item);
        if let Some(status) = self.status {
            if status == PostStatus::Trash {
                item.trash();
            } else {
                item.status = status;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
