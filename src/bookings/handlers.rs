use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::bookings::dto::{BookingView, CreateBookingRequest, ListQuery};
use crate::bookings::services;
use crate::error::ApiResult;
use crate::extract::SharerUserId;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_own_bookings))
        .route("/bookings/owner", get(list_owner_bookings))
        .route("/bookings/:id", patch(approve_booking).get(get_booking))
}

#[derive(Debug, Deserialize)]
struct ApproveQuery {
    approved: bool,
}

#[instrument(skip(state, body))]
async fn create_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Json(body): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingView>)> {
    let view = services::create_booking(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
async fn approve_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    Query(query): Query<ApproveQuery>,
) -> ApiResult<Json<BookingView>> {
    let view = services::approve_booking(&state, user_id, id, query.approved).await?;
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn get_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
) -> ApiResult<Json<BookingView>> {
    Ok(Json(services::get_booking(&state, user_id, id).await?))
}

#[instrument(skip(state))]
async fn list_own_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BookingView>>> {
    Ok(Json(
        services::list_for_booker(&state, user_id, query).await?,
    ))
}

#[instrument(skip(state))]
async fn list_owner_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BookingView>>> {
    Ok(Json(services::list_for_owner(&state, user_id, query).await?))
}
