use sqlx::{FromRow, PgExecutor};

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
}

pub async fn insert(
    ex: impl PgExecutor<'_>,
    name: &str,
    email: &str,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        RETURNING id, name, email
        "#,
    )
    .bind(name)
    .bind(email)
    .fetch_one(ex)
    .await
}

pub async fn update(
    ex: impl PgExecutor<'_>,
    id: i64,
    name: &str,
    email: &str,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE users
        SET name = $2, email = $3
        WHERE id = $1
        RETURNING id, name, email
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(ex)
    .await
}

pub async fn find_by_id(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(ex)
    .await
}

pub async fn find_by_email(
    ex: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(ex)
    .await
}

pub async fn find_all(ex: impl PgExecutor<'_>) -> Result<Vec<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(ex)
    .await
}

pub async fn delete(ex: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}
