use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Message document as stored and as returned over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author: Uuid, // non-owning reference to users._id
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields needed to persist a fresh message. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub title: String,
    pub body: String,
    pub author: Uuid,
}

/// Overwrite-merge: `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<Uuid>,
}

impl MessagePatch {
    pub fn apply(&self, message: &mut Message) {
        if let Some(title) = &self.title {
            message.title = title.clone();
        }
        if let Some(body) = &self.body {
            message.body = body.clone();
        }
        if let Some(author) = self.author {
            message.author = author;
        }
    }
}
