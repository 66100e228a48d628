use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest, UserDto};
use crate::users::repo;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and validates a registration name. Missing or blank → Validation.
fn validated_name(name: Option<&str>) -> ApiResult<String> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::Validation("Name cannot be blank".into()));
    }
    Ok(name.to_string())
}

/// Trims and validates an email. Missing, blank or malformed → Validation.
fn validated_email(email: Option<&str>) -> ApiResult<String> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::Validation("Email cannot be blank".into()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    Ok(email.to_string())
}

pub async fn create_user(state: &AppState, req: CreateUserRequest) -> ApiResult<UserDto> {
    let name = validated_name(req.name.as_deref())?;
    let email = validated_email(req.email.as_deref())?;

    let mut tx = state.db.begin().await?;

    if repo::find_by_email(&mut *tx, &email).await?.is_some() {
        return Err(ApiError::Conflict(format!("Email already exists: {email}")));
    }

    let user = repo::insert(&mut *tx, &name, &email).await?;
    tx.commit().await?;

    info!(user_id = user.id, "user created");
    Ok(user.into())
}

pub async fn get_user(state: &AppState, user_id: i64) -> ApiResult<UserDto> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {user_id}")))?;
    Ok(user.into())
}

pub async fn list_users(state: &AppState) -> ApiResult<Vec<UserDto>> {
    let users = repo::find_all(&state.db).await?;
    Ok(users.into_iter().map(UserDto::from).collect())
}

pub async fn update_user(
    state: &AppState,
    user_id: i64,
    req: UpdateUserRequest,
) -> ApiResult<UserDto> {
    let mut tx = state.db.begin().await?;

    let mut existing = repo::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {user_id}")))?;

    let mut updated = false;

    if let Some(name) = req.name.as_deref() {
        existing.name = validated_name(Some(name))?;
        updated = true;
    }

    if let Some(email) = req.email.as_deref() {
        let email = validated_email(Some(email))?;
        if email != existing.email {
            if repo::find_by_email(&mut *tx, &email).await?.is_some() {
                return Err(ApiError::Conflict(format!("Email already exists: {email}")));
            }
            existing.email = email;
            updated = true;
        }
    }

    if !updated {
        return Ok(existing.into());
    }

    let user = repo::update(&mut *tx, user_id, &existing.name, &existing.email).await?;
    tx.commit().await?;

    info!(user_id, "user updated");
    Ok(user.into())
}

pub async fn delete_user(state: &AppState, user_id: i64) -> ApiResult<()> {
    repo::delete(&state.db, user_id).await?;
    info!(user_id, "user deleted");
    Ok(())
}
