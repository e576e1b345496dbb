use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateUserRequest, UserList};
use super::repo_types::User;
use crate::{
    error::{ApiError, ApiResult},
    messages::{dto::MessageList, services::messages_by_author},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/messages", get(list_user_messages))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserList>> {
    let users = state.store.find_users().await?;
    Ok(Json(UserList { users }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;
    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {id} not found")))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(payload) = payload?;
    let user = state.store.insert_user(payload.into_new()?).await?;
    info!(user_id = %user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn list_user_messages(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageList>> {
    let Path(id) = id?;
    let messages = messages_by_author(state.store.as_ref(), id).await?;
    Ok(Json(MessageList { messages }))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_app;

    use super::*;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn create_and_fetch_user_without_password() {
        let app = build_app(AppState::fake());
        let (status, created) = call(
            &app,
            post("/api/users", json!({ "username": "myuser", "password": "mypassword" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "myuser");
        assert!(created.get("password").is_none());
        assert_eq!(created["messages"], json!([]));

        let id = created["_id"].as_str().unwrap();
        let (status, fetched) = call(&app, get(&format!("/api/users/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["_id"], id);

        let (_, list) = call(&app, get("/api/users")).await;
        assert_eq!(list["users"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_409() {
        let app = build_app(AppState::fake());
        let body = json!({ "username": "myuser", "password": "mypassword" });
        call(&app, post("/api/users", body.clone())).await;
        let (status, err) = call(&app, post("/api/users", body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error_code"], "CONFLICT");
    }

    #[tokio::test]
    async fn whitespace_password_is_400() {
        let app = build_app(AppState::fake());
        let (status, err) = call(
            &app,
            post("/api/users", json!({ "username": "myuser", "password": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "password is required");
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let app = build_app(AppState::fake());
        let (status, _) = call(&app, get(&format!("/api/users/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            call(&app, get(&format!("/api/users/{}/messages", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_messages_are_newest_first() {
        let app = build_app(AppState::fake());
        let (_, user) = call(
            &app,
            post("/api/users", json!({ "username": "myuser", "password": "mypassword" })),
        )
        .await;
        let author = user["_id"].as_str().unwrap().to_string();

        for title in ["first", "second"] {
            let (status, _) = call(
                &app,
                post(
                    "/api/messages",
                    json!({ "title": title, "body": "b", "author": author }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = call(&app, get(&format!("/api/users/{author}/messages"))).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }
}
