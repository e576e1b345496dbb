use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record. Owns the ordered list of message ids it authored,
/// most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String, // stored as given, never exposed in JSON
    pub messages: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn prepend_message(&mut self, message_id: Uuid) {
        self.messages.insert(0, message_id);
    }

    /// Drops every reference to `message_id`; returns whether anything was removed.
    pub fn remove_message(&mut self, message_id: Uuid) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| *m != message_id);
        self.messages.len() != before
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
