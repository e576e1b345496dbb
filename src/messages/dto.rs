use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Message, MessagePatch, NewMessage};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<Uuid>,
}

/// Any subset of the message fields; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMessageRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ApiError::validation(format!("{field} must not be blank"))),
        None => Err(ApiError::validation(format!("{field} is required"))),
    }
}

fn optional(field: &str, value: Option<String>) -> ApiResult<Option<String>> {
    value.map(|v| required(field, Some(v))).transpose()
}

impl CreateMessageRequest {
    pub fn into_new(self) -> ApiResult<NewMessage> {
        let title = required("title", self.title)?;
        let body = required("body", self.body)?;
        let author = self
            .author
            .ok_or_else(|| ApiError::validation("author is required"))?;
        Ok(NewMessage { title, body, author })
    }
}

impl UpdateMessageRequest {
    pub fn into_patch(self) -> ApiResult<MessagePatch> {
        Ok(MessagePatch {
            title: optional("title", self.title)?,
            body: optional("body", self.body)?,
            author: self.author,
        })
    }
}
