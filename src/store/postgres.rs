use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::messages::repo_types::{Message, MessagePatch, NewMessage};
use crate::users::repo_types::{NewUser, User};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn map_unique(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    let is_unique = e
        .as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);
    if is_unique {
        StoreError::Conflict(what())
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find_messages(&self) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, title, body, author, created_at, updated_at
            FROM messages
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_message_by_id(&self, id: Uuid) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, title, body, author, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_messages_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.title, m.body, m.author, m.created_at, m.updated_at
              FROM unnest($1::uuid[]) WITH ORDINALITY AS wanted(id, ord)
              JOIN messages m ON m.id = wanted.id
             ORDER BY wanted.ord
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert_message(&self, new: NewMessage) -> StoreResult<Message> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, title, body, author)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, body, author, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.title)
        .bind(new.body)
        .bind(new.author)
        .fetch_one(&self.db)
        .await?;
        debug!(message_id = %row.id, "message inserted");
        Ok(row)
    }

    async fn find_message_by_id_and_update(
        &self,
        id: Uuid,
        patch: MessagePatch,
    ) -> StoreResult<Option<Message>> {
        // `prior` is evaluated before the UPDATE, so RETURNING hands back the old row.
        let row = sqlx::query_as::<_, Message>(
            r#"
            WITH prior AS (
                SELECT id, title, body, author, created_at, updated_at
                  FROM messages
                 WHERE id = $1
                   FOR UPDATE
            )
            UPDATE messages m
               SET title      = COALESCE($2, m.title),
                   body       = COALESCE($3, m.body),
                   author     = COALESCE($4, m.author),
                   updated_at = now()
              FROM prior
             WHERE m.id = prior.id
            RETURNING prior.id, prior.title, prior.body, prior.author,
                      prior.created_at, prior.updated_at
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.body)
        .bind(patch.author)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_message_by_id_and_delete(&self, id: Uuid) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            DELETE FROM messages
             WHERE id = $1
            RETURNING id, title, body, author, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password, messages, created_at
            FROM users
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password, messages, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let username = new.username.clone();
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, messages, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.username)
        .bind(new.password)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique(e, || format!("username {username:?} already taken")))?;
        Ok(row)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET username = $2,
                   password = $3,
                   messages = $4
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.messages.as_slice())
        .execute(&self.db)
        .await
        .map_err(|e| map_unique(e, || format!("username {:?} already taken", user.username)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: "user",
                id: user.id,
            });
        }
        debug!(user_id = %user.id, refs = user.messages.len(), "user saved");
        Ok(())
    }
}
