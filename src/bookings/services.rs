//! Booking lifecycle engine: creation, approval, views and the state
//! filtered listings. Every mutating operation runs in one transaction and
//! reads the clock exactly once.

use time::PrimitiveDateTime;
use tracing::info;

use crate::bookings::dto::{BookingState, BookingView, CreateBookingRequest, ListQuery};
use crate::bookings::repo::{self, BookingRecord, BookingStatus};
use crate::error::{ApiError, ApiResult};
use crate::items::repo as items_repo;
use crate::policy;
use crate::state::AppState;
use crate::users::repo as users_repo;

/// Half-open interval overlap: `[s1, e1)` meets `[s2, e2)`.
pub(crate) fn overlaps(
    s1: PrimitiveDateTime,
    e1: PrimitiveDateTime,
    s2: PrimitiveDateTime,
    e2: PrimitiveDateTime,
) -> bool {
    s1 < e2 && e1 > s2
}

/// Validates the requested interval against the fixed precondition order.
fn validated_interval(
    start: Option<PrimitiveDateTime>,
    end: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> ApiResult<(PrimitiveDateTime, PrimitiveDateTime)> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ApiError::Validation(
            "Start and end dates cannot be null".into(),
        ));
    };
    if start < now {
        return Err(ApiError::Validation("Start date cannot be in the past".into()));
    }
    if end < start {
        return Err(ApiError::Validation(
            "End date must be after start date".into(),
        ));
    }
    if start == end {
        return Err(ApiError::Validation(
            "Start and end dates cannot be equal".into(),
        ));
    }
    Ok((start, end))
}

/// `from`/`size` with the wire defaults (0, 10); negative offset or a
/// non-positive page size rejects.
fn validated_page(from: Option<i64>, size: Option<i64>) -> ApiResult<(i64, i64)> {
    let from = from.unwrap_or(0);
    let size = size.unwrap_or(10);
    if from < 0 {
        return Err(ApiError::Validation("from must be non-negative".into()));
    }
    if size <= 0 {
        return Err(ApiError::Validation("size must be positive".into()));
    }
    Ok((size, from))
}

fn parsed_state(state: Option<&str>) -> ApiResult<BookingState> {
    match state {
        None => Ok(BookingState::All),
        Some(s) => s.parse().map_err(ApiError::Validation),
    }
}

/// Decides the post-approval status once the item lock is held. WAITING is
/// the only state that may transition; approval additionally requires the
/// interval to still be free of other APPROVED bookings of the item.
fn approval_outcome(
    booking_id: i64,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    current: BookingStatus,
    approved: bool,
    conflicting: &[BookingRecord],
) -> ApiResult<BookingStatus> {
    if current != BookingStatus::Waiting {
        return Err(ApiError::Validation(
            "Booking can only be approved from WAITING status".into(),
        ));
    }
    if !approved {
        return Ok(BookingStatus::Rejected);
    }
    let taken = conflicting.iter().any(|b| {
        b.id != booking_id
            && b.status == BookingStatus::Approved
            && overlaps(b.start_date, b.end_date, start, end)
    });
    if taken {
        return Err(ApiError::Validation(
            "Item is already booked for this time period".into(),
        ));
    }
    Ok(BookingStatus::Approved)
}

pub async fn create_booking(
    state: &AppState,
    actor_id: i64,
    req: CreateBookingRequest,
) -> ApiResult<BookingView> {
    let now = state.clock.now();
    let mut tx = state.db.begin().await?;

    let booker = users_repo::find_by_id(&mut *tx, actor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {actor_id}")))?;

    let item_id = req
        .item_id
        .ok_or_else(|| ApiError::Validation("itemId is required".into()))?;
    let item = items_repo::find_by_id(&mut *tx, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item not found with id: {item_id}")))?;

    if !item.available {
        return Err(ApiError::Validation(
            "Item is not available for booking".into(),
        ));
    }

    // Owner booking their own item surfaces as NotFound, not Forbidden.
    if item.owner_id == booker.id {
        return Err(ApiError::NotFound("Owner cannot book own item".into()));
    }

    let (start, end) = validated_interval(req.start, req.end, now)?;

    let conflicting = repo::find_overlapping(&mut *tx, item.id, start, end).await?;
    if conflicting
        .iter()
        .any(|b| overlaps(b.start_date, b.end_date, start, end))
    {
        return Err(ApiError::Validation(
            "Item is already booked for this time period".into(),
        ));
    }

    let booking_id =
        repo::insert(&mut *tx, item.id, booker.id, start, end, BookingStatus::Waiting).await?;
    let row = repo::find_by_id(&mut *tx, booking_id)
        .await?
        .ok_or(ApiError::Database(sqlx::Error::RowNotFound))?;

    tx.commit().await?;

    info!(booking_id, actor_id, item_id, "booking created");
    Ok(row.into())
}

pub async fn approve_booking(
    state: &AppState,
    actor_id: i64,
    booking_id: i64,
    approved: bool,
) -> ApiResult<BookingView> {
    let mut tx = state.db.begin().await?;

    let booking = repo::find_by_id(&mut *tx, booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found with id: {booking_id}")))?;

    if !policy::can_approve(actor_id, booking.item_owner_id) {
        return Err(ApiError::Forbidden(
            "Only item owner can approve booking".into(),
        ));
    }

    if booking.status != BookingStatus::Waiting {
        return Err(ApiError::Validation(
            "Booking can only be approved from WAITING status".into(),
        ));
    }

    // Serialize concurrent approvals per item: the row lock makes the
    // status and overlap re-checks below authoritative.
    items_repo::lock_for_update(&mut *tx, booking.item_id).await?;

    let current = repo::find_status(&mut *tx, booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found with id: {booking_id}")))?;

    let conflicting = if approved {
        repo::find_overlapping(&mut *tx, booking.item_id, booking.start_date, booking.end_date)
            .await?
    } else {
        Vec::new()
    };
    let next_status = approval_outcome(
        booking_id,
        booking.start_date,
        booking.end_date,
        current,
        approved,
        &conflicting,
    )?;

    repo::set_status(&mut *tx, booking_id, next_status).await?;
    let row = repo::find_by_id(&mut *tx, booking_id)
        .await?
        .ok_or(ApiError::Database(sqlx::Error::RowNotFound))?;

    tx.commit().await?;

    info!(booking_id, actor_id, status = ?next_status, "booking status updated");
    Ok(row.into())
}

pub async fn get_booking(
    state: &AppState,
    actor_id: i64,
    booking_id: i64,
) -> ApiResult<BookingView> {
    let booking = repo::find_by_id(&state.db, booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found with id: {booking_id}")))?;

    // View refusal does not leak existence.
    if !policy::can_view_booking(actor_id, booking.booker_id, booking.item_owner_id) {
        return Err(ApiError::NotFound(
            "Only booker or item owner can view booking".into(),
        ));
    }

    Ok(booking.into())
}

pub async fn list_for_booker(
    state: &AppState,
    actor_id: i64,
    query: ListQuery,
) -> ApiResult<Vec<BookingView>> {
    let filter = parsed_state(query.state.as_deref())?;
    let (limit, offset) = validated_page(query.from, query.size)?;

    users_repo::find_by_id(&state.db, actor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {actor_id}")))?;

    let now = state.clock.now();
    let db = &state.db;
    let rows = match filter {
        BookingState::All => repo::by_booker_all(db, actor_id, limit, offset).await?,
        BookingState::Current => repo::by_booker_current(db, actor_id, now, limit, offset).await?,
        BookingState::Past => repo::by_booker_past(db, actor_id, now, limit, offset).await?,
        BookingState::Future => repo::by_booker_future(db, actor_id, now, limit, offset).await?,
        BookingState::Waiting => {
            repo::by_booker_status(db, actor_id, BookingStatus::Waiting, limit, offset).await?
        }
        BookingState::Rejected => {
            repo::by_booker_status(db, actor_id, BookingStatus::Rejected, limit, offset).await?
        }
    };

    Ok(rows.into_iter().map(BookingView::from).collect())
}

pub async fn list_for_owner(
    state: &AppState,
    actor_id: i64,
    query: ListQuery,
) -> ApiResult<Vec<BookingView>> {
    let filter = parsed_state(query.state.as_deref())?;
    let (limit, offset) = validated_page(query.from, query.size)?;

    // Retained wire behavior: an owner with no items is NotFound.
    if items_repo::count_by_owner(&state.db, actor_id).await? == 0 {
        return Err(ApiError::NotFound("User has no items".into()));
    }

    let now = state.clock.now();
    let db = &state.db;
    let rows = match filter {
        BookingState::All => repo::by_owner_all(db, actor_id, limit, offset).await?,
        BookingState::Current => repo::by_owner_current(db, actor_id, now, limit, offset).await?,
        BookingState::Past => repo::by_owner_past(db, actor_id, now, limit, offset).await?,
        BookingState::Future => repo::by_owner_future(db, actor_id, now, limit, offset).await?,
        BookingState::Waiting => {
            repo::by_owner_status(db, actor_id, BookingStatus::Waiting, limit, offset).await?
        }
        BookingState::Rejected => {
            repo::by_owner_status(db, actor_id, BookingStatus::Rejected, limit, offset).await?
        }
    };

    Ok(rows.into_iter().map(BookingView::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: PrimitiveDateTime = datetime!(2030-01-01 00:00:00);

    #[test]
    fn overlap_is_half_open() {
        let s = datetime!(2030-02-01 10:00:00);
        let e = datetime!(2030-02-01 12:00:00);

        // Contained, straddling, identical: all overlap.
        assert!(overlaps(s, e, datetime!(2030-02-01 11:00:00), datetime!(2030-02-01 13:00:00)));
        assert!(overlaps(s, e, datetime!(2030-02-01 09:00:00), datetime!(2030-02-01 11:00:00)));
        assert!(overlaps(s, e, s, e));
        assert!(overlaps(s, e, datetime!(2030-02-01 10:30:00), datetime!(2030-02-01 11:30:00)));

        // Touching endpoints do not overlap.
        assert!(!overlaps(s, e, e, datetime!(2030-02-01 14:00:00)));
        assert!(!overlaps(s, e, datetime!(2030-02-01 08:00:00), s));

        // Disjoint.
        assert!(!overlaps(s, e, datetime!(2030-02-02 10:00:00), datetime!(2030-02-02 12:00:00)));
    }

    #[test]
    fn interval_requires_both_dates() {
        let err = validated_interval(None, Some(datetime!(2030-02-01 12:00:00)), NOW).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = validated_interval(Some(datetime!(2030-02-01 10:00:00)), None, NOW).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn interval_rejects_past_start() {
        let err = validated_interval(
            Some(datetime!(2029-12-31 23:59:59)),
            Some(datetime!(2030-02-01 12:00:00)),
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn interval_start_at_now_is_allowed() {
        let (s, e) = validated_interval(Some(NOW), Some(datetime!(2030-01-01 01:00:00)), NOW)
            .expect("start == now is valid");
        assert_eq!(s, NOW);
        assert_eq!(e, datetime!(2030-01-01 01:00:00));
    }

    #[test]
    fn interval_rejects_end_before_or_equal_to_start() {
        let start = datetime!(2030-02-01 12:00:00);
        let err =
            validated_interval(Some(start), Some(datetime!(2030-02-01 10:00:00)), NOW).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = validated_interval(Some(start), Some(start), NOW).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(validated_page(None, None).unwrap(), (10, 0));
        assert_eq!(validated_page(Some(20), Some(5)).unwrap(), (5, 20));
        assert!(matches!(
            validated_page(Some(-1), None),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validated_page(None, Some(0)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validated_page(None, Some(-3)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn state_defaults_to_all() {
        assert_eq!(parsed_state(None).unwrap(), BookingState::All);
        assert_eq!(parsed_state(Some("PAST")).unwrap(), BookingState::Past);
        assert!(matches!(
            parsed_state(Some("SOMETIME")),
            Err(ApiError::Validation(_))
        ));
    }

    const START: PrimitiveDateTime = datetime!(2030-02-01 10:00:00);
    const END: PrimitiveDateTime = datetime!(2030-02-01 12:00:00);

    fn record(
        id: i64,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
        status: BookingStatus,
    ) -> BookingRecord {
        BookingRecord {
            id,
            item_id: 7,
            booker_id: 2,
            start_date: start,
            end_date: end,
            status,
        }
    }

    #[test]
    fn only_waiting_bookings_transition() {
        for current in [
            BookingStatus::Approved,
            BookingStatus::Rejected,
            BookingStatus::Canceled,
        ] {
            for approved in [true, false] {
                let err = approval_outcome(1, START, END, current, approved, &[]).unwrap_err();
                assert!(matches!(err, ApiError::Validation(_)));
            }
        }
    }

    #[test]
    fn waiting_booking_is_approved_when_interval_is_free() {
        assert_eq!(
            approval_outcome(1, START, END, BookingStatus::Waiting, true, &[]).unwrap(),
            BookingStatus::Approved
        );

        // The booking's own row and a touching approved interval are fine.
        let own = record(1, START, END, BookingStatus::Waiting);
        let touching = record(
            9,
            datetime!(2030-02-01 08:00:00),
            START,
            BookingStatus::Approved,
        );
        assert_eq!(
            approval_outcome(1, START, END, BookingStatus::Waiting, true, &[own, touching])
                .unwrap(),
            BookingStatus::Approved
        );
    }

    #[test]
    fn approval_fails_when_interval_was_taken() {
        let winner = record(
            9,
            datetime!(2030-02-01 11:00:00),
            datetime!(2030-02-01 13:00:00),
            BookingStatus::Approved,
        );
        let err = approval_outcome(1, START, END, BookingStatus::Waiting, true, &[winner])
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn rejection_ignores_existing_approvals() {
        let winner = record(9, START, END, BookingStatus::Approved);
        assert_eq!(
            approval_outcome(1, START, END, BookingStatus::Waiting, false, &[winner]).unwrap(),
            BookingStatus::Rejected
        );
    }
}
