//! # Permission Gate
//!
//! Capability-based read/edit/create/publish checks.
//!
//! The gate never knows about role names. A caller is a user id plus the
//! capability set the identity provider reports *for this request*; the
//! checks below are pure functions of that set and the item's
//! status/author/type. Nothing is cached between calls, so a capability
//! granted or revoked between two requests is honoured by the second one.

use crate::content::PostType;
use crate::{ContentItem, PostStatus, RexError, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CAPABILITIES
// =============================================================================

/// What a capability allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    Edit,
    EditOthers,
    EditPublished,
    EditPrivate,
    Publish,
    ReadPrivate,
    Delete,
}

impl Action {
    const ALL: [Action; 7] = [
        Action::Edit,
        Action::EditOthers,
        Action::EditPublished,
        Action::EditPrivate,
        Action::Publish,
        Action::ReadPrivate,
        Action::Delete,
    ];

    fn prefix(self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::EditOthers => "edit_others",
            Action::EditPublished => "edit_published",
            Action::EditPrivate => "edit_private",
            Action::Publish => "publish",
            Action::ReadPrivate => "read_private",
            Action::Delete => "delete",
        }
    }
}

/// Which family of post types a capability covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityScope {
    /// Posts and every custom type.
    Posts,
    Pages,
}

impl CapabilityScope {
    #[must_use]
    pub fn of(post_type: &PostType) -> Self {
        if post_type.is_page() {
            CapabilityScope::Pages
        } else {
            CapabilityScope::Posts
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            CapabilityScope::Posts => "posts",
            CapabilityScope::Pages => "pages",
        }
    }
}

/// A single capability, e.g. `edit_others_posts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub action: Action,
    pub scope: CapabilityScope,
}

impl Capability {
    #[must_use]
    pub fn new(action: Action, scope: CapabilityScope) -> Self {
        Self { action, scope }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.action.prefix(), self.scope.suffix())
    }
}

impl FromStr for Capability {
    type Err = RexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, scope) = if let Some(prefix) = s.strip_suffix("_posts") {
            (prefix, CapabilityScope::Posts)
        } else if let Some(prefix) = s.strip_suffix("_pages") {
            (prefix, CapabilityScope::Pages)
        } else {
            return Err(RexError::invalid(format!("unknown capability '{}'", s)));
        };

        Action::ALL
            .into_iter()
            .find(|action| action.prefix() == prefix)
            .map(|action| Capability::new(action, scope))
            .ok_or_else(|| RexError::invalid(format!("unknown capability '{}'", s)))
    }
}

/// The set of capabilities a caller holds right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse capability names, failing on the first unknown one.
    pub fn parse<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, RexError> {
        names
            .into_iter()
            .map(str::parse::<Capability>)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.0.remove(&capability);
    }

    #[must_use]
    pub fn has(&self, action: Action, scope: CapabilityScope) -> bool {
        self.0.contains(&Capability::new(action, scope))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Capability> for CapabilitySet {
    fn extend<I: IntoIterator<Item = Capability>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

// =============================================================================
// CALLER + AUTHORIZER
// =============================================================================

/// Identity and authorization provider.
///
/// Implementations must answer from their live state on every call.
pub trait Authorizer {
    /// Current capabilities of `user`, or `None` if the user is unknown.
    fn capabilities(&self, user: UserId) -> Option<CapabilitySet>;
}

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: UserId,
    pub capabilities: CapabilitySet,
}

impl Caller {
    #[must_use]
    pub fn new(user: UserId, capabilities: CapabilitySet) -> Self {
        Self { user, capabilities }
    }

    /// Resolve `user` against the provider's current state.
    pub fn resolve(authorizer: &dyn Authorizer, user: UserId) -> Option<Self> {
        authorizer
            .capabilities(user)
            .map(|capabilities| Self::new(user, capabilities))
    }

    fn has(&self, action: Action, post_type: &PostType) -> bool {
        self.capabilities
            .has(action, CapabilityScope::of(post_type))
    }

    fn is_author_of(&self, item: &ContentItem) -> bool {
        item.author == self.user
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Whether `caller` may read `item`.
///
/// Published items are world-readable. Private items need authorship or
/// `read_private_*`. Everything else (draft, pending, trash) is readable
/// exactly when it is editable.
#[must_use]
pub fn can_read(caller: &Caller, item: &ContentItem) -> bool {
    match item.status {
        PostStatus::Publish => true,
        PostStatus::Private => {
            caller.is_author_of(item) || caller.has(Action::ReadPrivate, &item.post_type)
        }
        PostStatus::Draft | PostStatus::Pending | PostStatus::Trash => can_edit(caller, item),
    }
}

/// Whether `caller` may modify `item`.
#[must_use]
pub fn can_edit(caller: &Caller, item: &ContentItem) -> bool {
    let post_type = &item.post_type;
    if !caller.has(Action::Edit, post_type) {
        return false;
    }
    if !caller.is_author_of(item) && !caller.has(Action::EditOthers, post_type) {
        return false;
    }
    match item.status {
        PostStatus::Publish => caller.has(Action::EditPublished, post_type),
        PostStatus::Private => caller.has(Action::EditPrivate, post_type),
        PostStatus::Draft | PostStatus::Pending | PostStatus::Trash => true,
    }
}

/// Whether `caller` may create items of `post_type`.
#[must_use]
pub fn can_create(caller: &Caller, post_type: &PostType) -> bool {
    caller.has(Action::Edit, post_type)
}

/// Whether `caller` may publish items of `post_type`.
#[must_use]
pub fn can_publish(caller: &Caller, post_type: &PostType) -> bool {
    caller.has(Action::Publish, post_type)
}

/// Whether `caller` may trash or delete `item`.
#[must_use]
pub fn can_delete(caller: &Caller, item: &ContentItem) -> bool {
    caller.has(Action::Delete, &item.post_type) && can_edit(caller, item)
}

// =============================================================================
// TESTS
// =============================================================================
