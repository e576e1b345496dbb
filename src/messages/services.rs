//! Message lifecycle. Each operation that touches both collections keeps
//! `message.author` and the author's reference list in step.
//!
//! The two writes are not atomic. A failed second step on create is undone by
//! deleting the fresh message again, and a failed author move on update puts
//! the old author back. When the undo fails too, the ids involved are logged.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo_types::{Message, MessagePatch, NewMessage};
use crate::error::{ApiError, ApiResult};
use crate::store::DocumentStore;

fn message_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("message {id} not found"))
}

fn author_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("author {id} not found"))
}

pub async fn list_messages(store: &dyn DocumentStore) -> ApiResult<Vec<Message>> {
    Ok(store.find_messages().await?)
}

pub async fn get_message(store: &dyn DocumentStore, id: Uuid) -> ApiResult<Message> {
    store
        .find_message_by_id(id)
        .await?
        .ok_or_else(|| message_not_found(id))
}

pub async fn create_message(store: &dyn DocumentStore, new: NewMessage) -> ApiResult<Message> {
    let message = store.insert_message(new).await?;

    if let Err(e) = link_to_author(store, &message).await {
        rollback_insert(store, message.id).await;
        return Err(e);
    }

    info!(message_id = %message.id, author = %message.author, "message created");
    Ok(message)
}

async fn link_to_author(store: &dyn DocumentStore, message: &Message) -> ApiResult<()> {
    let mut author = store
        .find_user_by_id(message.author)
        .await?
        .ok_or_else(|| author_not_found(message.author))?;
    author.prepend_message(message.id);
    store.save_user(&author).await?;
    Ok(())
}

async fn rollback_insert(store: &dyn DocumentStore, id: Uuid) {
    match store.find_message_by_id_and_delete(id).await {
        Ok(_) => warn!(message_id = %id, "author link failed; message rolled back"),
        Err(e) => error!(
            message_id = %id,
            error = %e,
            "author link failed and rollback failed; message is orphaned"
        ),
    }
}

pub async fn update_message(
    store: &dyn DocumentStore,
    id: Uuid,
    patch: MessagePatch,
) -> ApiResult<Message> {
    let new_author = patch.author;

    // Check before writing so a bad author never lands in the message.
    if let Some(author) = new_author {
        if store.find_user_by_id(author).await?.is_none() {
            return Err(author_not_found(author));
        }
    }

    let prior = store
        .find_message_by_id_and_update(id, patch)
        .await?
        .ok_or_else(|| message_not_found(id))?;

    if let Some(author) = new_author.filter(|a| *a != prior.author) {
        if let Err(e) = relink(store, id, prior.author, author).await {
            rollback_relink(store, id, prior.author, author).await;
            return Err(e);
        }
    }

    get_message(store, id).await
}

/// Points the message back at `from` and makes sure `from` still lists it.
async fn rollback_relink(store: &dyn DocumentStore, message_id: Uuid, from: Uuid, to: Uuid) {
    let revert = MessagePatch {
        author: Some(from),
        ..Default::default()
    };
    if let Err(e) = store.find_message_by_id_and_update(message_id, revert).await {
        error!(
            %message_id, %from, %to, error = %e,
            "author change failed and rollback failed; message references new author"
        );
        return;
    }

    let restored = match store.find_user_by_id(from).await {
        Ok(Some(mut old)) if !old.messages.contains(&message_id) => {
            old.prepend_message(message_id);
            store.save_user(&old).await
        }
        Ok(_) => Ok(()),
        Err(e) => Err(e),
    };
    match restored {
        Ok(()) => warn!(%message_id, %from, %to, "author change failed; author rolled back"),
        Err(e) => error!(
            %message_id, %from, %to, error = %e,
            "author change rolled back but previous author lost the reference; message is orphaned"
        ),
    }
}

/// Moves `message_id` from one author's reference list to another's.
async fn relink(store: &dyn DocumentStore, message_id: Uuid, from: Uuid, to: Uuid) -> ApiResult<()> {
    match store.find_user_by_id(from).await? {
        Some(mut old) => {
            if old.remove_message(message_id) {
                store.save_user(&old).await?;
            }
        }
        None => warn!(%message_id, previous_author = %from, "previous author missing; nothing to unlink"),
    }

    let mut new = store
        .find_user_by_id(to)
        .await?
        .ok_or_else(|| author_not_found(to))?;
    if !new.messages.contains(&message_id) {
        new.prepend_message(message_id);
        store.save_user(&new).await?;
    }

    info!(%message_id, %from, %to, "message author changed");
    Ok(())
}

pub async fn delete_message(store: &dyn DocumentStore, id: Uuid) -> ApiResult<Message> {
    let deleted = store
        .find_message_by_id_and_delete(id)
        .await?
        .ok_or_else(|| message_not_found(id))?;

    match store.find_user_by_id(deleted.author).await? {
        Some(mut author) => {
            if author.remove_message(id) {
                store.save_user(&author).await.map_err(|e| {
                    error!(message_id = %id, author = %author.id, error = %e, "message deleted but author still references it");
                    e
                })?;
            } else {
                warn!(message_id = %id, author = %author.id, "author did not reference deleted message");
            }
        }
        None => warn!(message_id = %id, author = %deleted.author, "author of deleted message not found"),
    }

    info!(message_id = %id, "message deleted");
    Ok(deleted)
}

/// Resolves a user's reference list, most recent first.
pub async fn messages_by_author(store: &dyn DocumentStore, user_id: Uuid) -> ApiResult<Vec<Message>> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))?;
    Ok(store.find_messages_by_ids(&user.messages).await?)
}
