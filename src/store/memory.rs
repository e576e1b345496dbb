use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoreResult};
use crate::messages::repo_types::{Message, MessagePatch, NewMessage};
use crate::users::repo_types::{NewUser, User};

#[derive(Default)]
struct Collections {
    messages: HashMap<Uuid, Message>,
    users: HashMap<Uuid, User>,
}

/// In-process store. Every call takes the lock once, so each single
/// operation is atomic; sequences of calls are not.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_messages(&self) -> StoreResult<Vec<Message>> {
        let guard = self.inner.read().await;
        let mut out: Vec<Message> = guard.messages.values().cloned().collect();
        out.sort_by_key(|m| (m.created_at, m.id));
        Ok(out)
    }

    async fn find_message_by_id(&self, id: Uuid) -> StoreResult<Option<Message>> {
        Ok(self.inner.read().await.messages.get(&id).cloned())
    }

    async fn find_messages_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Message>> {
        let guard = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| guard.messages.get(id).cloned())
            .collect())
    }

    async fn insert_message(&self, new: NewMessage) -> StoreResult<Message> {
        let now = OffsetDateTime::now_utc();
        let message = Message {
            id: Uuid::new_v4(),
            title: new.title,
            body: new.body,
            author: new.author,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .messages
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_message_by_id_and_update(
        &self,
        id: Uuid,
        patch: MessagePatch,
    ) -> StoreResult<Option<Message>> {
        let mut guard = self.inner.write().await;
        let Some(stored) = guard.messages.get_mut(&id) else {
            return Ok(None);
        };
        let before = stored.clone();
        patch.apply(stored);
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(before))
    }

    async fn find_message_by_id_and_delete(&self, id: Uuid) -> StoreResult<Option<Message>> {
        Ok(self.inner.write().await.messages.remove(&id))
    }

    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let guard = self.inner.read().await;
        let mut out: Vec<User> = guard.users.values().cloned().collect();
        out.sort_by_key(|u| (u.created_at, u.id));
        Ok(out)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut guard = self.inner.write().await;
        if guard.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(format!(
                "username {:?} already taken",
                new.username
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            password: new.password,
            messages: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        guard.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        match guard.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: "user",
                id: user.id,
            }),
        }
    }
}
