//! Publish: swap a staging item into its original, or promote it in place.

use super::PublishOutcome;
use crate::auth::{can_edit, can_publish};
use crate::primitives::LAST_PUBLISH_SOURCE_META_KEY;
use crate::{Caller, ContentItem, ContentStore, PostId, PostStatus, RexError};

/// Publish the staging item `staging_id`.
///
/// If the item links to an original that still exists (trashed counts), the
/// original is restored from the trash, receives the staging item's title,
/// body, excerpt, terms and non-protected meta, and becomes published; the
/// staging item is trashed. If the original has been hard-deleted, or there
/// is no link, the staging item itself is published and its link cleared.
pub fn publish<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    staging_id: PostId,
) -> Result<PublishOutcome, RexError> {
    let mut staging = store
        .get(staging_id)?
        .ok_or(RexError::NotFound(staging_id))?;
    if !can_publish(caller, &staging.post_type) {
        return Err(RexError::forbidden(format!(
            "cannot publish {} items",
            staging.post_type
        )));
    }
    if !can_edit(caller, &staging) {
        return Err(RexError::forbidden(format!(
            "cannot edit item {}",
            staging_id
        )));
    }

    let linked = staging.original.filter(|id| *id != staging_id);
    if let Some(original_id) = linked
        && let Some(original) = store.get(original_id)?
    {
        swap(store, &mut staging, original)?;
        return Ok(PublishOutcome {
            published_id: original_id,
            used_original: true,
        });
    }

    // Original hard-deleted (or never linked): the draft goes live itself
    staging.original = None;
    promote(&mut staging);
    store.update(staging)?;
    Ok(PublishOutcome {
        published_id: staging_id,
        used_original: false,
    })
}

fn swap<S: ContentStore + ?Sized>(
    store: &mut S,
    staging: &mut ContentItem,
    mut original: ContentItem,
) -> Result<(), RexError> {
    original.untrash();
    original.title.clone_from(&staging.title);
    original.content.clone_from(&staging.content);
    original.excerpt.clone_from(&staging.excerpt);
    original.terms.clone_from(&staging.terms);
    original.replace_public_meta_from(staging);
    original.meta.insert(
        LAST_PUBLISH_SOURCE_META_KEY.to_string(),
        staging.id.to_string(),
    );
    promote(&mut original);
    store.update(original)?;

    staging.trash();
    store.update(staging.clone())?;
    Ok(())
}

fn promote(item: &mut ContentItem) {
    item.status = PostStatus::Publish;
    item.trashed_from = None;
}
