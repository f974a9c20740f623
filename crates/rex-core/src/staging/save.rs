//! Save: create or update an item under optimistic concurrency control.

use super::fork::{branch, ensure_can_fork};
use super::{SaveOutcome, SaveReason, SaveRequest};
use crate::auth::{can_create, can_edit, can_publish};
use crate::{Caller, ContentItem, ContentPatch, ContentStore, PostStatus, PostType, RexError};

/// Save `request` on behalf of `caller`.
///
/// Without an id a new item is created (status defaults to draft). With an
/// id the item is updated in place, unless the request carries a token that
/// no longer matches the stored `modified_gmt`: then the current item is
/// forked, the request's data is laid over the fork (forced to draft) and
/// the outcome reports `forked` with reason `conflict`.
///
/// A client-supplied original link is always dropped.
pub fn save<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    request: SaveRequest,
) -> Result<SaveOutcome, RexError> {
    let token = request.token().map(str::to_owned);
    let patch = request.patch.sanitized();

    let Some(id) = request.id else {
        return create(store, caller, &request.post_type, &patch);
    };

    let current = store.get(id)?.ok_or(RexError::NotFound(id))?;
    if !can_edit(caller, &current) {
        return Err(RexError::forbidden(format!("cannot edit item {}", id)));
    }

    match token {
        Some(token) if !current.modified_gmt.matches(&token) => {
            conflict_fork(store, caller, &current, &patch)
        }
        _ => {
            ensure_can_set_status(caller, &current.post_type, current.status, &patch)?;
            let mut item = current;
            patch.apply(&mut item);
            let stored = store.update(item)?;
            Ok(SaveOutcome::in_place(&stored))
        }
    }
}

fn create<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    post_type: &PostType,
    patch: &ContentPatch,
) -> Result<SaveOutcome, RexError> {
    if !can_create(caller, post_type) {
        return Err(RexError::forbidden(format!(
            "cannot create {} items",
            post_type
        )));
    }
    ensure_can_set_status(caller, post_type, PostStatus::Draft, patch)?;

    let mut item = ContentItem::new(post_type.clone(), PostStatus::Draft, caller.user);
    patch.apply(&mut item);
    let stored = store.insert(item)?;
    Ok(SaveOutcome::in_place(&stored))
}

/// The client's copy is stale: keep both versions by writing to a fork.
fn conflict_fork<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    current: &ContentItem,
    patch: &ContentPatch,
) -> Result<SaveOutcome, RexError> {
    ensure_can_fork(caller, current)?;

    let mut item = branch(current, caller, PostStatus::Draft);
    patch.apply_content(&mut item);
    let stored = store.insert(item)?;
    Ok(SaveOutcome::forked(&stored, SaveReason::Conflict))
}

/// Moving an item into `publish` or `private` needs the publish capability.
fn ensure_can_set_status(
    caller: &Caller,
    post_type: &PostType,
    from: PostStatus,
    patch: &ContentPatch,
) -> Result<(), RexError> {
    match patch.status {
        Some(to @ (PostStatus::Publish | PostStatus::Private))
            if to != from && !can_publish(caller, post_type) =>
        {
            Err(RexError::forbidden(format!(
                "cannot set status '{}' on {} items",
                to, post_type
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{LAST_PUBLISH_SOURCE_META_KEY, ORIGINAL_META_KEY};
    use crate::staging::fixtures::{self, CONTRIBUTOR, EDITOR};
    use crate::staging::fork;
    use crate::{MemoryStore, PostId, TermId};

    #[test]
    fn create_defaults_to_draft() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let request = SaveRequest::create(PostType::post(), ContentPatch::new().title("New"));
        let outcome = save(&mut store, &fixtures::contributor(), request)?;

        assert!(outcome.saved);
        assert!(!outcome.forked);
        assert_eq!(outcome.status, PostStatus::Draft);

        let item = store.get(outcome.id)?.ok_or(RexError::NotFound(outcome.id))?;
        assert_eq!(item.title, "New");
        assert_eq!(item.author, CONTRIBUTOR);
        Ok(())
    }

    #[test]
    fn create_requires_capability_for_type() {
        let mut store = MemoryStore::new();
        let request = SaveRequest::create(PostType::page(), ContentPatch::new().title("Page"));
        assert!(matches!(
            save(&mut store, &fixtures::editor(), request),
            Err(RexError::Forbidden(_))
        ));
    }

    #[test]
    fn create_drops_client_original_link() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let published = fixtures::seed(&mut store, PostStatus::Publish, "pub")?;
        let patch = ContentPatch::new().meta(ORIGINAL_META_KEY, published.id.to_string());
        let outcome = save(
            &mut store,
            &fixtures::editor(),
            SaveRequest::create(PostType::post(), patch),
        )?;

        let item = store.get(outcome.id)?.ok_or(RexError::NotFound(outcome.id))?;
        assert_eq!(item.original, None);
        assert!(!item.meta.contains_key(ORIGINAL_META_KEY));
        assert_eq!(outcome.original_post_id, None);
        Ok(())
    }

    #[test]
    fn update_without_token_is_unconditional() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Draft, "v1")?;
        let outcome = save(
            &mut store,
            &fixtures::editor(),
            SaveRequest::update(item.id, ContentPatch::new().title("v2")),
        )?;

        assert_eq!(outcome.id, item.id);
        assert!(!outcome.forked);
        assert_ne!(outcome.modified_gmt, item.modified_gmt.to_string());
        let stored = store.get(item.id)?.ok_or(RexError::NotFound(item.id))?;
        assert_eq!(stored.title, "v2");
        Ok(())
    }

    #[test]
    fn matching_token_updates_in_place_repeatedly() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Draft, "v1")?;
        let editor = fixtures::editor();

        let mut token = item.modified_gmt.to_string();
        for round in 0..3 {
            let request = SaveRequest::update(item.id, ContentPatch::new().title(format!("r{}", round)))
                .expecting(token.clone());
            let outcome = save(&mut store, &editor, request)?;
            assert_eq!(outcome.id, item.id);
            assert!(!outcome.forked);
            token = outcome.modified_gmt;
        }
        assert_eq!(store.len()?, 1);
        Ok(())
    }

    #[test]
    fn empty_token_counts_as_absent() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Draft, "v1")?;
        let request = SaveRequest::update(item.id, ContentPatch::new().title("v2")).expecting("");
        let outcome = save(&mut store, &fixtures::editor(), request)?;
        assert!(!outcome.forked);
        assert_eq!(outcome.id, item.id);
        Ok(())
    }

    #[test]
    fn stale_token_forks_instead_of_overwriting() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let published = fixtures::seed(&mut store, PostStatus::Publish, "Original")?;
        let editor = fixtures::editor();
        let staging = fork::fork(&mut store, &editor, published.id, PostStatus::Draft)?;
        let stale = staging.modified_gmt.clone();

        // Someone else saves in between
        save(
            &mut store,
            &editor,
            SaveRequest::update(staging.id, ContentPatch::new().content("theirs")),
        )?;
        let before = store.get(staging.id)?;

        let mut patch = ContentPatch::new().title("mine");
        patch
            .terms
            .insert("category".to_string(), [TermId(4)].into_iter().collect());
        let outcome = save(
            &mut store,
            &editor,
            SaveRequest::update(staging.id, patch).expecting(stale),
        )?;

        assert!(outcome.saved);
        assert!(outcome.forked);
        assert_eq!(outcome.reason, Some(SaveReason::Conflict));
        assert_ne!(outcome.id, staging.id);
        assert_eq!(outcome.status, PostStatus::Draft);
        assert_eq!(outcome.original_post_id, Some(published.id));

        // The conflicting item is untouched
        assert_eq!(store.get(staging.id)?, before);

        let forked = store.get(outcome.id)?.ok_or(RexError::NotFound(outcome.id))?;
        assert_eq!(forked.title, "mine");
        assert_eq!(forked.content, "theirs");
        assert_eq!(forked.terms["category"], [TermId(4)].into_iter().collect());
        assert_eq!(forked.author, EDITOR);
        assert_eq!(forked.modified_gmt.to_string(), outcome.modified_gmt);
        Ok(())
    }

    #[test]
    fn conflict_fork_is_forced_to_draft() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Pending, "x")?;
        let request = SaveRequest::update(item.id, ContentPatch::new().status(PostStatus::Publish))
            .expecting("00000000000000000000");
        let outcome = save(&mut store, &fixtures::editor(), request)?;
        assert!(outcome.forked);
        assert_eq!(outcome.status, PostStatus::Draft);
        assert_eq!(outcome.original_post_id, None);
        Ok(())
    }

    #[test]
    fn conflict_on_unlinked_published_item_links_to_it() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Publish, "live")?;
        let request = SaveRequest::update(item.id, ContentPatch::new().title("mine"))
            .expecting("00000000000000000000");
        let outcome = save(&mut store, &fixtures::editor(), request)?;
        assert!(outcome.forked);
        assert_eq!(outcome.original_post_id, Some(item.id));
        assert_eq!(store.get(item.id)?, Some(item));
        Ok(())
    }

    #[test]
    fn save_drops_client_protected_meta() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let patch = ContentPatch::new()
            .meta(LAST_PUBLISH_SOURCE_META_KEY, "999")
            .meta("_edit_lock", "1")
            .meta("subtitle", "s");
        let outcome = save(
            &mut store,
            &fixtures::editor(),
            SaveRequest::create(PostType::post(), patch),
        )?;
        let item = store.get(outcome.id)?.ok_or(RexError::NotFound(outcome.id))?;
        assert_eq!(item.meta.len(), 1);
        assert_eq!(item.meta.get("subtitle").map(String::as_str), Some("s"));
        Ok(())
    }

    #[test]
    fn missing_item_is_not_found() {
        let mut store = MemoryStore::new();
        let request = SaveRequest::update(PostId(77), ContentPatch::new());
        assert_eq!(
            save(&mut store, &fixtures::visitor(), request),
            Err(RexError::NotFound(PostId(77)))
        );
    }

    #[test]
    fn contributor_cannot_edit_others_item() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let item = fixtures::seed(&mut store, PostStatus::Draft, "x")?;
        let before = store.clone();

        let plain = SaveRequest::update(item.id, ContentPatch::new().title("y"));
        assert!(matches!(
            save(&mut store, &fixtures::contributor(), plain),
            Err(RexError::Forbidden(_))
        ));

        // A stale token does not turn a denied edit into a fork
        let stale = SaveRequest::update(item.id, ContentPatch::new().title("y")).expecting("1");
        assert!(matches!(
            save(&mut store, &fixtures::contributor(), stale),
            Err(RexError::Forbidden(_))
        ));
        assert_eq!(store, before);
        Ok(())
    }

    #[test]
    fn update_drops_client_original_link() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let published = fixtures::seed(&mut store, PostStatus::Publish, "pub")?;
        let draft = fixtures::seed(&mut store, PostStatus::Draft, "draft")?;

        let patch = ContentPatch::new().meta(ORIGINAL_META_KEY, published.id.to_string());
        save(&mut store, &fixtures::editor(), SaveRequest::update(draft.id, patch))?;

        let stored = store.get(draft.id)?.ok_or(RexError::NotFound(draft.id))?;
        assert_eq!(stored.original, None);
        Ok(())
    }

    #[test]
    fn publishing_through_save_needs_publish_capability() -> Result<(), RexError> {
        let mut store = MemoryStore::new();
        let contributor = fixtures::contributor();
        let own = save(
            &mut store,
            &contributor,
            SaveRequest::create(PostType::post(), ContentPatch::new().title("mine")),
        )?;

        let request = SaveRequest::update(own.id, ContentPatch::new().status(PostStatus::Publish));
        assert!(matches!(
            save(&mut store, &contributor, request),
            Err(RexError::Forbidden(_))
        ));

        let pending = SaveRequest::update(own.id, ContentPatch::new().status(PostStatus::Pending));
        assert_eq!(save(&mut store, &contributor, pending)?.status, PostStatus::Pending);
        Ok(())
    }
}
