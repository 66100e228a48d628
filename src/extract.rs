use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const SHARER_HEADER: &str = "X-Sharer-User-Id";

/// Acting-user id from the trusted `X-Sharer-User-Id` header.
/// Absent, non-numeric or non-positive values reject with 400.
#[derive(Debug)]
pub struct SharerUserId(pub i64);

/// Same header, but absence is allowed (used by `GET /items/{id}` where
/// anonymous callers get the stripped-down view). A present-but-invalid
/// value still rejects with 400.
pub struct MaybeSharerUserId(pub Option<i64>);

fn parse_header(parts: &Parts) -> Result<Option<i64>, ApiError> {
    let Some(raw) = parts.headers.get(SHARER_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            ApiError::Validation(format!("{SHARER_HEADER} header must be a positive integer"))
        })?;
    if id <= 0 {
        return Err(ApiError::Validation(format!(
            "{SHARER_HEADER} header must be a positive integer"
        )));
    }
    Ok(Some(id))
}

#[async_trait]
impl<S> FromRequestParts<S> for SharerUserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parse_header(parts)? {
            Some(id) => Ok(SharerUserId(id)),
            None => Err(ApiError::Validation(format!(
                "{SHARER_HEADER} header is required"
            ))),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSharerUserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSharerUserId(parse_header(parts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/bookings");
        if let Some(value) = header {
            builder = builder.header(SHARER_HEADER, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn accepts_positive_id() {
        let mut parts = parts_with(Some("42"));
        let SharerUserId(id) = SharerUserId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(id, 42);
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let mut parts = parts_with(None);
        let err = SharerUserId::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_zero_and_negative() {
        for bad in ["0", "-5"] {
            let mut parts = parts_with(Some(bad));
            let err = SharerUserId::from_request_parts(&mut parts, &())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn rejects_non_numeric() {
        let mut parts = parts_with(Some("abc"));
        let err = SharerUserId::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn optional_variant_allows_absence_but_not_garbage() {
        let mut parts = parts_with(None);
        let MaybeSharerUserId(id) = MaybeSharerUserId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(id, None);

        let mut parts = parts_with(Some("nope"));
        assert!(MaybeSharerUserId::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }
}
