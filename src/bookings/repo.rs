use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use time::PrimitiveDateTime;

/// Lifecycle status persisted per booking. CANCELED is reserved in the
/// schema but never produced by the engine; all non-WAITING states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

/// Plain `bookings` table row, used by the overlap and last/next queries.
#[derive(Debug, Clone, FromRow)]
pub struct BookingRecord {
    pub id: i64,
    pub item_id: i64,
    pub booker_id: i64,
    pub start_date: PrimitiveDateTime,
    pub end_date: PrimitiveDateTime,
    pub status: BookingStatus,
}

/// Booking joined with its booker and item, the shape every view is built
/// from.
#[derive(Debug, Clone, FromRow)]
pub struct BookingDetailsRow {
    pub id: i64,
    pub start_date: PrimitiveDateTime,
    pub end_date: PrimitiveDateTime,
    pub status: BookingStatus,
    pub booker_id: i64,
    pub booker_name: String,
    pub booker_email: String,
    pub item_id: i64,
    pub item_name: String,
    pub item_description: String,
    pub item_available: bool,
    pub item_owner_id: i64,
    pub item_request_id: Option<i64>,
}

const SELECT_DETAILS: &str = r#"
    SELECT b.id, b.start_date, b.end_date, b.status,
           u.id AS booker_id, u.name AS booker_name, u.email AS booker_email,
           i.id AS item_id, i.name AS item_name, i.description AS item_description,
           i.available AS item_available, i.owner_id AS item_owner_id,
           i.request_id AS item_request_id
    FROM bookings b
    JOIN users u ON u.id = b.booker_id
    JOIN items i ON i.id = b.item_id
"#;

// Listings order by start descending, greater id first on ties.
const ORDER_PAGE: &str = "ORDER BY b.start_date DESC, b.id DESC LIMIT $2 OFFSET $3";

pub async fn insert(
    ex: impl PgExecutor<'_>,
    item_id: i64,
    booker_id: i64,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    status: BookingStatus,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO bookings (item_id, booker_id, start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(item_id)
    .bind(booker_id)
    .bind(start)
    .bind(end)
    .bind(status)
    .fetch_one(ex)
    .await?;
    Ok(id)
}

pub async fn find_by_id(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE b.id = $1");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn find_status(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<BookingStatus>, sqlx::Error> {
    let row: Option<(BookingStatus,)> = sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row.map(|(s,)| s))
}

pub async fn set_status(
    ex: impl PgExecutor<'_>,
    id: i64,
    status: BookingStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(ex)
        .await?;
    Ok(())
}

// --- by-booker listings, one typed query per state case ---

pub async fn by_booker_all(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE b.booker_id = $1 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(booker_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
}

pub async fn by_booker_current(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_DETAILS} WHERE b.booker_id = $1 \
         AND b.start_date <= $4 AND b.end_date >= $4 {ORDER_PAGE}"
    );
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(booker_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_booker_past(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE b.booker_id = $1 AND b.end_date < $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(booker_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_booker_future(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE b.booker_id = $1 AND b.start_date > $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(booker_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_booker_status(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    status: BookingStatus,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE b.booker_id = $1 AND b.status = $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(booker_id)
        .bind(limit)
        .bind(offset)
        .bind(status)
        .fetch_all(ex)
        .await
}

// --- by-owner listings ---

pub async fn by_owner_all(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE i.owner_id = $1 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
}

pub async fn by_owner_current(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_DETAILS} WHERE i.owner_id = $1 \
         AND b.start_date <= $4 AND b.end_date >= $4 {ORDER_PAGE}"
    );
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_owner_past(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE i.owner_id = $1 AND b.end_date < $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_owner_future(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE i.owner_id = $1 AND b.start_date > $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .bind(now)
        .fetch_all(ex)
        .await
}

pub async fn by_owner_status(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    status: BookingStatus,
    limit: i64,
    offset: i64,
) -> Result<Vec<BookingDetailsRow>, sqlx::Error> {
    let sql = format!("{SELECT_DETAILS} WHERE i.owner_id = $1 AND b.status = $4 {ORDER_PAGE}");
    sqlx::query_as::<_, BookingDetailsRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .bind(status)
        .fetch_all(ex)
        .await
}

// --- invariant and projection queries ---

/// APPROVED bookings of the item whose half-open interval `[start, end)`
/// overlaps the given one.
pub async fn find_overlapping(
    ex: impl PgExecutor<'_>,
    item_id: i64,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<Vec<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE item_id = $1
          AND status = 'APPROVED'
          AND start_date < $3
          AND end_date > $2
        "#,
    )
    .bind(item_id)
    .bind(start)
    .bind(end)
    .fetch_all(ex)
    .await
}

/// Most recently ended APPROVED booking before `now`; greatest id on ties.
pub async fn find_last(
    ex: impl PgExecutor<'_>,
    item_id: i64,
    now: PrimitiveDateTime,
) -> Result<Option<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE item_id = $1 AND status = 'APPROVED' AND end_date < $2
        ORDER BY end_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(item_id)
    .bind(now)
    .fetch_optional(ex)
    .await
}

/// Earliest APPROVED booking starting strictly after `now`; least id on
/// ties.
pub async fn find_next(
    ex: impl PgExecutor<'_>,
    item_id: i64,
    now: PrimitiveDateTime,
) -> Result<Option<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE item_id = $1 AND status = 'APPROVED' AND start_date > $2
        ORDER BY start_date ASC, id ASC
        LIMIT 1
        "#,
    )
    .bind(item_id)
    .bind(now)
    .fetch_optional(ex)
    .await
}

/// Batched last-booking projection, one row per item at most.
pub async fn find_last_for(
    ex: impl PgExecutor<'_>,
    item_ids: &[i64],
    now: PrimitiveDateTime,
) -> Result<Vec<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT DISTINCT ON (item_id)
               id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE item_id = ANY($1) AND status = 'APPROVED' AND end_date < $2
        ORDER BY item_id, end_date DESC, id DESC
        "#,
    )
    .bind(item_ids)
    .bind(now)
    .fetch_all(ex)
    .await
}

/// Batched next-booking projection, one row per item at most.
pub async fn find_next_for(
    ex: impl PgExecutor<'_>,
    item_ids: &[i64],
    now: PrimitiveDateTime,
) -> Result<Vec<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT DISTINCT ON (item_id)
               id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE item_id = ANY($1) AND status = 'APPROVED' AND start_date > $2
        ORDER BY item_id, start_date ASC, id ASC
        "#,
    )
    .bind(item_ids)
    .bind(now)
    .fetch_all(ex)
    .await
}

/// APPROVED bookings the booker holds on the item. The caller applies the
/// temporal half of the comment eligibility rule.
pub async fn approved_for_booker_and_item(
    ex: impl PgExecutor<'_>,
    booker_id: i64,
    item_id: i64,
) -> Result<Vec<BookingRecord>, sqlx::Error> {
    sqlx::query_as::<_, BookingRecord>(
        r#"
        SELECT id, item_id, booker_id, start_date, end_date, status
        FROM bookings
        WHERE booker_id = $1 AND item_id = $2 AND status = 'APPROVED'
        "#,
    )
    .bind(booker_id)
    .bind(item_id)
    .fetch_all(ex)
    .await
}
