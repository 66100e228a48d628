use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest, UserDto};
use crate::users::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            patch(update_user).get(get_user).delete(delete_user),
        )
}

#[instrument(skip(state, body))]
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let user = services::create_user(&state, body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(services::get_user(&state, id).await?))
}

#[instrument(skip(state))]
async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserDto>>> {
    Ok(Json(services::list_users(&state).await?))
}

#[instrument(skip(state, body))]
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(services::update_user(&state, id, body).await?))
}

#[instrument(skip(state))]
async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    services::delete_user(&state, id).await?;
    Ok(StatusCode::OK)
}
