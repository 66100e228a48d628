//! Who may observe or mutate what. Pure id comparisons; callers decide how
//! a refusal surfaces (view refusals become NotFound so existence does not
//! leak, mutate refusals become Forbidden).

pub fn can_approve(actor_id: i64, item_owner_id: i64) -> bool {
    actor_id == item_owner_id
}

pub fn can_view_booking(actor_id: i64, booker_id: i64, item_owner_id: i64) -> bool {
    actor_id == booker_id || actor_id == item_owner_id
}

pub fn can_edit_item(actor_id: i64, item_owner_id: i64) -> bool {
    actor_id == item_owner_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_approves() {
        assert!(can_approve(1, 1));
        assert!(!can_approve(2, 1));
    }

    #[test]
    fn booker_and_owner_can_view() {
        assert!(can_view_booking(2, 2, 1));
        assert!(can_view_booking(1, 2, 1));
        assert!(!can_view_booking(3, 2, 1));
    }

    #[test]
    fn only_owner_edits_item() {
        assert!(can_edit_item(7, 7));
        assert!(!can_edit_item(8, 7));
    }
}
