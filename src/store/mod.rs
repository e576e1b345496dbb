//! Document store seam. Handlers only ever talk to `dyn DocumentStore`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::messages::repo_types::{Message, MessagePatch, NewMessage};
use crate::users::repo_types::{NewUser, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: Uuid },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Database(e)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_messages(&self) -> StoreResult<Vec<Message>>;
    async fn find_message_by_id(&self, id: Uuid) -> StoreResult<Option<Message>>;
    /// Resolves ids in the given order; ids with no document are skipped.
    async fn find_messages_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Message>>;
    async fn insert_message(&self, new: NewMessage) -> StoreResult<Message>;
    /// Applies `patch` and returns the document as it was before the write.
    async fn find_message_by_id_and_update(
        &self,
        id: Uuid,
        patch: MessagePatch,
    ) -> StoreResult<Option<Message>>;
    /// Removes the document and returns its last state.
    async fn find_message_by_id_and_delete(&self, id: Uuid) -> StoreResult<Option<Message>>;

    async fn find_users(&self) -> StoreResult<Vec<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    /// Overwrites an existing user document.
    async fn save_user(&self, user: &User) -> StoreResult<()>;
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// Wraps a `MemoryStore` and can be told to refuse user writes or message deletes.
    #[derive(Default)]
    pub struct FlakyStore {
        inner: MemoryStore,
        fail_user_saves: AtomicBool,
        fail_message_deletes: AtomicBool,
    }

    impl FlakyStore {
        pub fn fail_user_saves(&self, on: bool) {
            self.fail_user_saves.store(on, Ordering::SeqCst);
        }

        pub fn fail_message_deletes(&self, on: bool) {
            self.fail_message_deletes.store(on, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn find_messages(&self) -> StoreResult<Vec<Message>> {
            self.inner.find_messages().await
        }
        async fn find_message_by_id(&self, id: Uuid) -> StoreResult<Option<Message>> {
            self.inner.find_message_by_id(id).await
        }
        async fn find_messages_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Message>> {
            self.inner.find_messages_by_ids(ids).await
        }
        async fn insert_message(&self, new: NewMessage) -> StoreResult<Message> {
            self.inner.insert_message(new).await
        }
        async fn find_message_by_id_and_update(
            &self,
            id: Uuid,
            patch: MessagePatch,
        ) -> StoreResult<Option<Message>> {
            self.inner.find_message_by_id_and_update(id, patch).await
        }
        async fn find_message_by_id_and_delete(&self, id: Uuid) -> StoreResult<Option<Message>> {
            if self.fail_message_deletes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("message deletes disabled".into()));
            }
            self.inner.find_message_by_id_and_delete(id).await
        }
        async fn find_users(&self) -> StoreResult<Vec<User>> {
            self.inner.find_users().await
        }
        async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
            self.inner.find_user_by_id(id).await
        }
        async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
            self.inner.insert_user(new).await
        }
        async fn save_user(&self, user: &User) -> StoreResult<()> {
            if self.fail_user_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("user writes disabled".into()));
            }
            self.inner.save_user(user).await
        }
    }
}
