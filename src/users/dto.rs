use serde::{Deserialize, Serialize};

use super::repo_types::{NewUser, User};
use crate::error::{ApiError, ApiResult};

/// Request body for seeding an author.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

impl CreateUserRequest {
    pub fn into_new(self) -> ApiResult<NewUser> {
        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::validation("username is required"))?;
        let password = self
            .password
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::validation("password is required"))?;
        Ok(NewUser { username, password })
    }
}
