use sqlx::{FromRow, PgExecutor};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct ItemRecord {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
}

/// Comment joined with its author's name for the item views.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub item_id: i64,
    pub text: String,
    pub author_name: String,
    pub created: PrimitiveDateTime,
}

const SELECT_ITEM: &str =
    "SELECT id, owner_id, name, description, available, request_id FROM items";

pub async fn insert(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    name: &str,
    description: &str,
    available: bool,
) -> Result<ItemRecord, sqlx::Error> {
    sqlx::query_as::<_, ItemRecord>(
        r#"
        INSERT INTO items (owner_id, name, description, available)
        VALUES ($1, $2, $3, $4)
        RETURNING id, owner_id, name, description, available, request_id
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .bind(available)
    .fetch_one(ex)
    .await
}

pub async fn update(
    ex: impl PgExecutor<'_>,
    id: i64,
    name: &str,
    description: &str,
    available: bool,
) -> Result<ItemRecord, sqlx::Error> {
    sqlx::query_as::<_, ItemRecord>(
        r#"
        UPDATE items
        SET name = $2, description = $3, available = $4
        WHERE id = $1
        RETURNING id, owner_id, name, description, available, request_id
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(available)
    .fetch_one(ex)
    .await
}

pub async fn find_by_id(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<ItemRecord>, sqlx::Error> {
    let sql = format!("{SELECT_ITEM} WHERE id = $1");
    sqlx::query_as::<_, ItemRecord>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn find_all_by_owner(
    ex: impl PgExecutor<'_>,
    owner_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ItemRecord>, sqlx::Error> {
    let sql = format!("{SELECT_ITEM} WHERE owner_id = $1 ORDER BY id LIMIT $2 OFFSET $3");
    sqlx::query_as::<_, ItemRecord>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
}

pub async fn count_by_owner(ex: impl PgExecutor<'_>, owner_id: i64) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(ex)
        .await?;
    Ok(count)
}

/// Case-insensitive substring search over name and description of
/// available items. Callers are expected to have trimmed the text and
/// short-circuited on blank input.
pub async fn search_available(
    ex: impl PgExecutor<'_>,
    text: &str,
) -> Result<Vec<ItemRecord>, sqlx::Error> {
    let sql = format!(
        "{SELECT_ITEM} \
         WHERE available = true \
           AND (name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%') \
         ORDER BY id"
    );
    sqlx::query_as::<_, ItemRecord>(&sql)
        .bind(text)
        .fetch_all(ex)
        .await
}

/// Row lock on the item, taken before the approve-time overlap re-check so
/// concurrent approvals on the same item serialize.
pub async fn lock_for_update(ex: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM items WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(())
}

// --- comments ---

pub async fn insert_comment(
    ex: impl PgExecutor<'_>,
    item_id: i64,
    author_id: i64,
    text: &str,
    created: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO comments (item_id, author_id, text, created)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(item_id)
    .bind(author_id)
    .bind(text)
    .bind(created)
    .fetch_one(ex)
    .await?;
    Ok(id)
}

const SELECT_COMMENTS: &str = r#"
    SELECT c.id, c.item_id, c.text, u.name AS author_name, c.created
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

pub async fn comments_by_item(
    ex: impl PgExecutor<'_>,
    item_id: i64,
) -> Result<Vec<CommentRow>, sqlx::Error> {
    let sql = format!("{SELECT_COMMENTS} WHERE c.item_id = $1 ORDER BY c.created DESC, c.id DESC");
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(item_id)
        .fetch_all(ex)
        .await
}

pub async fn comments_by_items(
    ex: impl PgExecutor<'_>,
    item_ids: &[i64],
) -> Result<Vec<CommentRow>, sqlx::Error> {
    let sql =
        format!("{SELECT_COMMENTS} WHERE c.item_id = ANY($1) ORDER BY c.created DESC, c.id DESC");
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(item_ids)
        .fetch_all(ex)
        .await
}
