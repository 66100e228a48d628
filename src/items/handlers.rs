use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::error::ApiResult;
use crate::extract::{MaybeSharerUserId, SharerUserId};
use crate::items::dto::{
    CommentRequest, CommentView, CreateItemRequest, ItemDto, OwnerListQuery, SearchQuery,
    UpdateItemRequest,
};
use crate::items::services;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item).get(list_items))
        .route("/items/search", get(search_items))
        .route("/items/:id", patch(update_item).get(get_item))
        .route("/items/:id/comment", post(add_comment))
}

#[instrument(skip(state, body))]
async fn create_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Json(body): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemDto>)> {
    let item = services::create_item(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, body))]
async fn update_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    Json(body): Json<UpdateItemRequest>,
) -> ApiResult<Json<ItemDto>> {
    Ok(Json(services::update_item(&state, user_id, id, body).await?))
}

#[instrument(skip(state))]
async fn get_item(
    State(state): State<AppState>,
    MaybeSharerUserId(user_id): MaybeSharerUserId,
    Path(id): Path<i64>,
) -> ApiResult<Json<ItemDto>> {
    Ok(Json(services::get_item(&state, user_id, id).await?))
}

#[instrument(skip(state))]
async fn list_items(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Query(query): Query<OwnerListQuery>,
) -> ApiResult<Json<Vec<ItemDto>>> {
    Ok(Json(
        services::list_by_owner(&state, user_id, query.from, query.size).await?,
    ))
}

#[instrument(skip(state))]
async fn search_items(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ItemDto>>> {
    Ok(Json(
        services::search_items(&state, query.text.as_deref()).await?,
    ))
}

#[instrument(skip(state, body))]
async fn add_comment(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let comment = services::add_comment(&state, user_id, id, body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
