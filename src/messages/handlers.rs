use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateMessageRequest, MessageList, UpdateMessageRequest};
use super::repo_types::Message;
use super::services;
use crate::{error::ApiResult, state::AppState};

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route(
            "/messages/:id",
            get(get_message).put(update_message).delete(delete_message),
        )
}

#[instrument(skip(state))]
pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Json<MessageList>> {
    let messages = services::list_messages(state.store.as_ref()).await?;
    Ok(Json(MessageList { messages }))
}

#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Message>> {
    let Path(id) = id?;
    let message = services::get_message(state.store.as_ref(), id).await?;
    Ok(Json(message))
}

#[instrument(skip(state, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let Json(payload) = payload?;
    let new = payload.into_new()?;
    let message = services::create_message(state.store.as_ref(), new).await?;
    Ok(Json(message))
}

#[instrument(skip(state, payload))]
pub async fn update_message(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateMessageRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let patch = payload.into_patch()?;
    let message = services::update_message(state.store.as_ref(), id, patch).await?;
    Ok(Json(message))
}

#[instrument(skip(state))]
pub async fn delete_message(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    services::delete_message(state.store.as_ref(), id).await?;
    Ok(StatusCode::OK)
}
