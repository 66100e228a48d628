use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::bookings::repo::{BookingDetailsRow, BookingStatus};
use crate::items::dto::ItemDto;
use crate::timefmt::iso_local;
use crate::users::dto::UserDto;

/// Body for `POST /bookings`. Dates are optional so the engine can report
/// their absence as a validation failure instead of a deserialize error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub item_id: Option<i64>,
    #[serde(default, with = "iso_local::option")]
    pub start: Option<PrimitiveDateTime>,
    #[serde(default, with = "iso_local::option")]
    pub end: Option<PrimitiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: i64,
    #[serde(with = "iso_local")]
    pub start: PrimitiveDateTime,
    #[serde(with = "iso_local")]
    pub end: PrimitiveDateTime,
    pub status: BookingStatus,
    pub booker: UserDto,
    pub item: ItemDto,
}

impl From<BookingDetailsRow> for BookingView {
    fn from(row: BookingDetailsRow) -> Self {
        Self {
            id: row.id,
            start: row.start_date,
            end: row.end_date,
            status: row.status,
            booker: UserDto {
                id: row.booker_id,
                name: row.booker_name,
                email: row.booker_email,
            },
            item: ItemDto {
                id: row.item_id,
                name: row.item_name,
                description: row.item_description,
                available: row.item_available,
                owner_id: row.item_owner_id,
                request_id: row.item_request_id,
                last_booking: None,
                next_booking: None,
                comments: None,
            },
        }
    }
}

/// Temporal/status filter for the booking listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl FromStr for BookingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(BookingState::All),
            "CURRENT" => Ok(BookingState::Current),
            "PAST" => Ok(BookingState::Past),
            "FUTURE" => Ok(BookingState::Future),
            "WAITING" => Ok(BookingState::Waiting),
            "REJECTED" => Ok(BookingState::Rejected),
            other => Err(format!("Unknown state: {other}")),
        }
    }
}

/// Query string for the listings: `?state=&from=&size=`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub state: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn state_parses_every_filter() {
        assert_eq!("ALL".parse::<BookingState>().unwrap(), BookingState::All);
        assert_eq!(
            "CURRENT".parse::<BookingState>().unwrap(),
            BookingState::Current
        );
        assert_eq!("PAST".parse::<BookingState>().unwrap(), BookingState::Past);
        assert_eq!(
            "FUTURE".parse::<BookingState>().unwrap(),
            BookingState::Future
        );
        assert_eq!(
            "WAITING".parse::<BookingState>().unwrap(),
            BookingState::Waiting
        );
        assert_eq!(
            "REJECTED".parse::<BookingState>().unwrap(),
            BookingState::Rejected
        );
    }

    #[test]
    fn state_rejects_unknown_and_lowercase() {
        assert!("APPROVED-ISH".parse::<BookingState>().is_err());
        assert!("all".parse::<BookingState>().is_err());
    }

    #[test]
    fn create_request_accepts_missing_dates() {
        let req: CreateBookingRequest = serde_json::from_str(r#"{"itemId": 5}"#).unwrap();
        assert_eq!(req.item_id, Some(5));
        assert!(req.start.is_none());
        assert!(req.end.is_none());
    }

    #[test]
    fn view_serializes_wire_shape() {
        let row = BookingDetailsRow {
            id: 3,
            start_date: datetime!(2030-02-01 10:00:00),
            end_date: datetime!(2030-02-01 12:00:00),
            status: BookingStatus::Waiting,
            booker_id: 2,
            booker_name: "Booker".into(),
            booker_email: "booker@example.com".into(),
            item_id: 1,
            item_name: "Drill".into(),
            item_description: "Cordless".into(),
            item_available: true,
            item_owner_id: 1,
            item_request_id: None,
        };
        let json = serde_json::to_value(BookingView::from(row)).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["start"], "2030-02-01T10:00:00");
        assert_eq!(json["end"], "2030-02-01T12:00:00");
        assert_eq!(json["status"], "WAITING");
        assert_eq!(json["booker"]["id"], 2);
        assert_eq!(json["booker"]["email"], "booker@example.com");
        assert_eq!(json["item"]["id"], 1);
        assert_eq!(json["item"]["ownerId"], 1);
        // Booking views never carry the owner-only slots.
        assert_eq!(json["item"]["lastBooking"], serde_json::Value::Null);
        assert_eq!(json["item"]["nextBooking"], serde_json::Value::Null);
    }
}
