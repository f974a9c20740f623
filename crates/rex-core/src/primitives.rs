//! # Primitives
//!
//! Identifiers and the version token shared by every module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Meta key under which the original link is exposed to clients.
///
/// Clients may read it but never write it: Save strips it from every patch.
pub const ORIGINAL_META_KEY: &str = "_rex_original_post_id";

/// Meta key recording which staging item last published over an original.
pub const LAST_PUBLISH_SOURCE_META_KEY: &str = "_rex_last_publish_source";

/// Prefix marking a meta key as protected (store-internal).
pub const PROTECTED_META_PREFIX: char = '_';

/// Width of the rendered version token.
const MODIFIED_GMT_WIDTH: usize = 20;

/// Stable identifier of a content item, assigned by the store.
///
/// `0` is never assigned; it marks an item that has not been stored yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl PostId {
    /// Placeholder id carried by an item before the store assigns one.
    pub const UNASSIGNED: PostId = PostId(0);

    /// Whether the store has assigned this id.
    #[must_use]
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a caller, as resolved by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a taxonomy term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(pub u64);

/// Version token of a content item.
///
/// A reading of the store's logical clock, taken on every content-affecting
/// write. Rendered as a fixed-width decimal string so that lexical order
/// matches numeric order; clients only ever compare it for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifiedGmt(pub u64);

impl ModifiedGmt {
    /// Whether `token` (as supplied by a client) names this exact version.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        self.to_string() == token
    }
}

impl fmt::Display for ModifiedGmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = MODIFIED_GMT_WIDTH)
    }
}

/// Whether a meta key is protected (never copied between items).
#[must_use]
pub fn is_protected_meta(key: &str) -> bool {
    key.starts_with(PROTECTED_META_PREFIX)
}
