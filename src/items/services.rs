//! Item views enriched with booking projections and comments, search, and
//! comment creation gated on past approved bookings.

use std::collections::HashMap;

use time::PrimitiveDateTime;
use tracing::info;

use crate::bookings::repo::{self as bookings_repo, BookingRecord, BookingStatus};
use crate::error::{ApiError, ApiResult};
use crate::items::dto::{
    CommentRequest, CommentView, CreateItemRequest, ItemDto, UpdateItemRequest,
};
use crate::items::repo::{self, ItemRecord};
use crate::policy;
use crate::state::AppState;
use crate::users::repo as users_repo;

fn validated_text(value: Option<&str>, field: &str) -> ApiResult<String> {
    let value = value.unwrap_or_default().trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field} cannot be blank")));
    }
    Ok(value.to_string())
}

/// Trims the search text; blank input means "do not consult the store".
fn normalized_search_text(text: Option<&str>) -> Option<String> {
    let text = text?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub async fn create_item(
    state: &AppState,
    actor_id: i64,
    req: CreateItemRequest,
) -> ApiResult<ItemDto> {
    let name = validated_text(req.name.as_deref(), "Name")?;
    let description = validated_text(req.description.as_deref(), "Description")?;
    let available = req
        .available
        .ok_or_else(|| ApiError::Validation("Available status cannot be null".into()))?;

    let mut tx = state.db.begin().await?;

    users_repo::find_by_id(&mut *tx, actor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {actor_id}")))?;

    let item = repo::insert(&mut *tx, actor_id, &name, &description, available).await?;
    tx.commit().await?;

    info!(item_id = item.id, actor_id, "item created");
    Ok(ItemDto::bare(item))
}

pub async fn update_item(
    state: &AppState,
    actor_id: i64,
    item_id: i64,
    req: UpdateItemRequest,
) -> ApiResult<ItemDto> {
    let now = state.clock.now();
    let mut tx = state.db.begin().await?;

    let mut existing = repo::find_by_id(&mut *tx, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item not found with id: {item_id}")))?;

    if !policy::can_edit_item(actor_id, existing.owner_id) {
        return Err(ApiError::Forbidden("Only owner can update item".into()));
    }

    let mut updated = false;

    if let Some(name) = req.name.as_deref() {
        existing.name = validated_text(Some(name), "Name")?;
        updated = true;
    }
    if let Some(description) = req.description.as_deref() {
        existing.description = validated_text(Some(description), "Description")?;
        updated = true;
    }
    if let Some(available) = req.available {
        existing.available = available;
        updated = true;
    }

    if updated {
        existing = repo::update(
            &mut *tx,
            item_id,
            &existing.name,
            &existing.description,
            existing.available,
        )
        .await?;
        info!(item_id, actor_id, "item updated");
    }

    let view = owner_view(&mut tx, existing, now).await?;
    tx.commit().await?;
    Ok(view)
}

pub async fn get_item(
    state: &AppState,
    viewer_id: Option<i64>,
    item_id: i64,
) -> ApiResult<ItemDto> {
    let now = state.clock.now();
    let item = repo::find_by_id(&state.db, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item not found with id: {item_id}")))?;

    // Booking slots are owner-only; everyone still sees the comments.
    let is_owner = viewer_id == Some(item.owner_id);

    let last = if is_owner {
        bookings_repo::find_last(&state.db, item.id, now).await?
    } else {
        None
    };
    let next = if is_owner {
        bookings_repo::find_next(&state.db, item.id, now).await?
    } else {
        None
    };
    let comments = repo::comments_by_item(&state.db, item.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();

    Ok(ItemDto::with_details(item, last, next, comments))
}

pub async fn list_by_owner(
    state: &AppState,
    actor_id: i64,
    from: Option<i64>,
    size: Option<i64>,
) -> ApiResult<Vec<ItemDto>> {
    let from = from.unwrap_or(0);
    let size = size.unwrap_or(10);
    if from < 0 {
        return Err(ApiError::Validation("from must be non-negative".into()));
    }
    if size <= 0 {
        return Err(ApiError::Validation("size must be positive".into()));
    }

    users_repo::find_by_id(&state.db, actor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {actor_id}")))?;

    let now = state.clock.now();
    let items = repo::find_all_by_owner(&state.db, actor_id, size, from).await?;
    let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();

    let mut last_by_item: HashMap<i64, _> =
        bookings_repo::find_last_for(&state.db, &item_ids, now)
            .await?
            .into_iter()
            .map(|b| (b.item_id, b))
            .collect();
    let mut next_by_item: HashMap<i64, _> =
        bookings_repo::find_next_for(&state.db, &item_ids, now)
            .await?
            .into_iter()
            .map(|b| (b.item_id, b))
            .collect();

    let mut comments_by_item: HashMap<i64, Vec<CommentView>> = HashMap::new();
    for comment in repo::comments_by_items(&state.db, &item_ids).await? {
        comments_by_item
            .entry(comment.item_id)
            .or_default()
            .push(comment.into());
    }

    Ok(items
        .into_iter()
        .map(|item| {
            let last = last_by_item.remove(&item.id);
            let next = next_by_item.remove(&item.id);
            let comments = comments_by_item.remove(&item.id).unwrap_or_default();
            ItemDto::with_details(item, last, next, comments)
        })
        .collect())
}

pub async fn search_items(state: &AppState, text: Option<&str>) -> ApiResult<Vec<ItemDto>> {
    let Some(text) = normalized_search_text(text) else {
        return Ok(Vec::new());
    };
    let items = repo::search_available(&state.db, &text).await?;
    Ok(items.into_iter().map(ItemDto::bare).collect())
}

/// Eligibility rule for commenting: at least one APPROVED booking that
/// already ended. `end_date == now` is not yet "ended".
pub(crate) fn has_finished_booking(bookings: &[BookingRecord], now: PrimitiveDateTime) -> bool {
    bookings
        .iter()
        .any(|b| b.status == BookingStatus::Approved && b.end_date < now)
}

/// True iff the actor has an APPROVED booking on the item that already
/// ended. The comment endpoint delegates its eligibility check here.
pub async fn can_comment(
    state: &AppState,
    actor_id: i64,
    item_id: i64,
    now: PrimitiveDateTime,
) -> ApiResult<bool> {
    let bookings =
        bookings_repo::approved_for_booker_and_item(&state.db, actor_id, item_id).await?;
    Ok(has_finished_booking(&bookings, now))
}

pub async fn add_comment(
    state: &AppState,
    actor_id: i64,
    item_id: i64,
    req: CommentRequest,
) -> ApiResult<CommentView> {
    let now = state.clock.now();

    let author = users_repo::find_by_id(&state.db, actor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {actor_id}")))?;

    let item = repo::find_by_id(&state.db, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item not found with id: {item_id}")))?;

    let eligible = can_comment(state, author.id, item.id, now).await?;
    if !eligible {
        return Err(ApiError::Validation(
            "Only users who have booked this item can leave comments".into(),
        ));
    }

    // Eligibility first, then the text itself; matches the historical
    // error precedence of the endpoint.
    let text = validated_text(req.text.as_deref(), "Comment text")?;

    // Append-only single insert; no multi-statement transaction needed.
    let comment_id = repo::insert_comment(&state.db, item.id, author.id, &text, now).await?;

    info!(comment_id, item_id, actor_id, "comment added");
    Ok(CommentView {
        id: comment_id,
        text,
        author_name: author.name,
        created: now,
    })
}

async fn owner_view(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    item: ItemRecord,
    now: PrimitiveDateTime,
) -> ApiResult<ItemDto> {
    let last = bookings_repo::find_last(&mut **tx, item.id, now).await?;
    let next = bookings_repo::find_next(&mut **tx, item.id, now).await?;
    let comments = repo::comments_by_item(&mut **tx, item.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();
    Ok(ItemDto::with_details(item, last, next, comments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn blank_fields_are_rejected() {
        assert!(matches!(
            validated_text(None, "Name"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validated_text(Some("   "), "Name"),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(validated_text(Some(" Drill "), "Name").unwrap(), "Drill");
    }

    #[test]
    fn blank_search_text_short_circuits() {
        assert_eq!(normalized_search_text(None), None);
        assert_eq!(normalized_search_text(Some("")), None);
        assert_eq!(normalized_search_text(Some("   ")), None);
        assert_eq!(normalized_search_text(Some(" drill ")), Some("drill".into()));
    }

    fn booking(status: BookingStatus, end: PrimitiveDateTime) -> BookingRecord {
        BookingRecord {
            id: 1,
            item_id: 7,
            booker_id: 2,
            start_date: end - time::Duration::days(1),
            end_date: end,
            status,
        }
    }

    #[test]
    fn comment_requires_a_finished_approved_booking() {
        let now = datetime!(2030-01-01 00:00:00);

        assert!(!has_finished_booking(&[], now));
        assert!(has_finished_booking(
            &[booking(BookingStatus::Approved, datetime!(2029-12-31 00:00:00))],
            now,
        ));
    }

    #[test]
    fn ongoing_or_future_booking_does_not_qualify() {
        let now = datetime!(2030-01-01 00:00:00);

        // A booking ending exactly at `now` has not ended yet.
        assert!(!has_finished_booking(
            &[booking(BookingStatus::Approved, now)],
            now,
        ));
        assert!(!has_finished_booking(
            &[booking(BookingStatus::Approved, datetime!(2030-02-01 00:00:00))],
            now,
        ));
    }

    #[test]
    fn unapproved_booking_does_not_qualify() {
        let now = datetime!(2030-01-01 00:00:00);

        for status in [
            BookingStatus::Waiting,
            BookingStatus::Rejected,
            BookingStatus::Canceled,
        ] {
            assert!(!has_finished_booking(
                &[booking(status, datetime!(2029-12-31 00:00:00))],
                now,
            ));
        }
    }
}
