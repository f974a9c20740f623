//! Permission-checked single-item access: read, trash, delete.

use super::DeleteOutcome;
use crate::auth::{can_delete, can_read};
use crate::{Caller, ContentItem, ContentStore, PostId, PostStatus, RexError};

/// Read `id` as `caller`.
pub fn read<S: ContentStore + ?Sized>(
    store: &S,
    caller: &Caller,
    id: PostId,
) -> Result<ContentItem, RexError> {
    let item = store.get(id)?.ok_or(RexError::NotFound(id))?;
    if !can_read(caller, &item) {
        return Err(RexError::forbidden(format!("cannot read item {}", id)));
    }
    Ok(item)
}

/// Move `id` to the trash, or hard-delete it when `force` is set.
pub fn delete<S: ContentStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    id: PostId,
    force: bool,
) -> Result<DeleteOutcome, RexError> {
    let mut item = store.get(id)?.ok_or(RexError::NotFound(id))?;
    if !can_delete(caller, &item) {
        return Err(RexError::forbidden(format!("cannot delete item {}", id)));
    }

    let previous_status = item.status;
    if force {
        store.remove(id)?;
    } else {
        if previous_status == PostStatus::Trash {
            return Err(RexError::invalid(format!(
                "item {} is already in the trash",
                id
            )));
        }
        item.trash();
        store.update(item)?;
    }

    Ok(DeleteOutcome {
        id,
        deleted: force,
        previous_status,
    })
}
