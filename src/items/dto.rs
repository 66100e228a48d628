use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::bookings::repo::BookingRecord;
use crate::items::repo::{CommentRow, ItemRecord};
use crate::timefmt::iso_local;

/// Reference to a booking inside an item view, owner-only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInfo {
    pub id: i64,
    pub booker_id: i64,
}

impl From<BookingRecord> for BookingInfo {
    fn from(b: BookingRecord) -> Self {
        Self {
            id: b.id,
            booker_id: b.booker_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    pub request_id: Option<i64>,
    pub last_booking: Option<BookingInfo>,
    pub next_booking: Option<BookingInfo>,
    pub comments: Option<Vec<CommentView>>,
}

impl ItemDto {
    /// Plain view with no booking slots and no comments attached (search
    /// results, item payloads nested inside booking views).
    pub fn bare(item: ItemRecord) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            available: item.available,
            owner_id: item.owner_id,
            request_id: item.request_id,
            last_booking: None,
            next_booking: None,
            comments: None,
        }
    }

    pub fn with_details(
        item: ItemRecord,
        last_booking: Option<BookingRecord>,
        next_booking: Option<BookingRecord>,
        comments: Vec<CommentView>,
    ) -> Self {
        Self {
            last_booking: last_booking.map(BookingInfo::from),
            next_booking: next_booking.map(BookingInfo::from),
            comments: Some(comments),
            ..Self::bare(item)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    #[serde(with = "iso_local")]
    pub created: PrimitiveDateTime,
}

impl From<CommentRow> for CommentView {
    fn from(c: CommentRow) -> Self {
        Self {
            id: c.id,
            text: c.text,
            author_name: c.author_name,
            created: c.created,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerListQuery {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::repo::BookingStatus;
    use time::macros::datetime;

    fn item() -> ItemRecord {
        ItemRecord {
            id: 1,
            owner_id: 1,
            name: "Drill".into(),
            description: "Cordless".into(),
            available: true,
            request_id: None,
        }
    }

    #[test]
    fn bare_view_has_null_slots() {
        let json = serde_json::to_value(ItemDto::bare(item())).unwrap();
        assert_eq!(json["ownerId"], 1);
        assert_eq!(json["lastBooking"], serde_json::Value::Null);
        assert_eq!(json["nextBooking"], serde_json::Value::Null);
        assert_eq!(json["comments"], serde_json::Value::Null);
    }

    #[test]
    fn detailed_view_carries_slot_ids() {
        let next = BookingRecord {
            id: 9,
            item_id: 1,
            booker_id: 2,
            start_date: datetime!(2030-02-01 10:00:00),
            end_date: datetime!(2030-02-01 12:00:00),
            status: BookingStatus::Approved,
        };
        let json =
            serde_json::to_value(ItemDto::with_details(item(), None, Some(next), vec![])).unwrap();
        assert_eq!(json["lastBooking"], serde_json::Value::Null);
        assert_eq!(json["nextBooking"]["id"], 9);
        assert_eq!(json["nextBooking"]["bookerId"], 2);
        assert_eq!(json["comments"], serde_json::json!([]));
    }

    #[test]
    fn comment_view_wire_shape() {
        let view = CommentView {
            id: 4,
            text: "good".into(),
            author_name: "Booker".into(),
            created: datetime!(2030-02-01 13:00:00),
        };
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["authorName"], "Booker");
        assert_eq!(json["created"], "2030-02-01T13:00:00");
    }
}
