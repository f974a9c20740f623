//! Fork: copy an item into a new staging item linked to its root original.

use super::ForkOutcome;
use crate::auth::{can_create, can_publish, can_read};
use crate::{Caller, ContentItem, ContentStore, PostId, PostStatus, RexError};

/// Fork `source_id` into a new item with `status`, authored by `caller`.
///
/// The new item copies title, body, excerpt, terms and non-protected meta.
/// Its original link collapses to the root: the source's own link if it has
/// one, else the source itself when published, else nothing. The source is
/// never modified.
pub fn fork<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    source_id: PostId,
    status: PostStatus,
) -> Result<ForkOutcome, RexError> {
    if status == PostStatus::Trash {
        return Err(RexError::invalid("cannot fork into the trash"));
    }

    let source = store
        .get(source_id)?
        .ok_or(RexError::NotFound(source_id))?;
    ensure_can_fork(caller, &source)?;
    if matches!(status, PostStatus::Publish | PostStatus::Private)
        && !can_publish(caller, &source.post_type)
    {
        return Err(RexError::forbidden(format!(
            "cannot fork into '{}': not allowed to publish {} items",
            status, source.post_type
        )));
    }

    let stored = store.insert(branch(&source, caller, status))?;
    Ok(ForkOutcome::from(&stored))
}

/// The published root an item forked from `item` would link to.
#[must_use]
pub fn root_original(item: &ContentItem) -> Option<PostId> {
    item.original
        .or_else(|| item.status.is_published().then_some(item.id))
}

/// Forking needs read access to the source and create access to its type.
pub(super) fn ensure_can_fork(caller: &Caller, source: &ContentItem) -> Result<(), RexError> {
    if !can_read(caller, source) {
        return Err(RexError::forbidden(format!(
            "cannot fork: item {} is not readable",
            source.id
        )));
    }
    if !can_create(caller, &source.post_type) {
        return Err(RexError::forbidden(format!(
            "cannot fork: not allowed to create {} items",
            source.post_type
        )));
    }
    Ok(())
}

/// Unstored copy of `source` owned by `caller`.
pub(super) fn branch(source: &ContentItem, caller: &Caller, status: PostStatus) -> ContentItem {
    let mut item = ContentItem::new(source.post_type.clone(), status, caller.user);
    item.title.clone_from(&source.title);
    item.content.clone_from(&source.content);
    item.excerpt.clone_from(&source.excerpt);
    item.terms.clone_from(&source.terms);
    item.meta = source
        .public_meta()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    item.original = root_original(source);
    item
}
