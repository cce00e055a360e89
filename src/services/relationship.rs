//! Membership set operations on a single record and a single field.
//!
//! Each relationship is stored on both sides (`club.members` / `user.clubs`,
//! `event.attendees` / `user.events`). The functions here touch one side
//! only: adding a value already present is a `Conflict`, removing a value
//! that is absent is a `NotFound`, and a failed call leaves the set as it was.
//! Keeping both sides in step is the caller's job, see [`mirror_insert`] and
//! [`mirror_remove`].

use chrono::Utc;

use crate::models::{ActivityEntry, ActivityInput, Club, Event, User, MAX_RECENT_ACTIVITY};
use crate::utils::error::{AppError, AppResult};

fn insert(set: &mut Vec<String>, value: &str, already: impl FnOnce() -> String) -> AppResult<()> {
    if set.iter().any(|v| v == value) {
        return Err(AppError::Conflict(already()));
    }
    set.push(value.to_string());
    Ok(())
}

fn remove(set: &mut Vec<String>, value: &str, missing: impl FnOnce() -> String) -> AppResult<()> {
    match set.iter().position(|v| v == value) {
        Some(index) => {
            set.remove(index);
            Ok(())
        }
        None => Err(AppError::NotFound(missing())),
    }
}

pub fn add_member(club: &mut Club, username: &str) -> AppResult<()> {
    insert(&mut club.members, username, || "User is already a member".to_string())
}

pub fn remove_member(club: &mut Club, username: &str) -> AppResult<()> {
    remove(&mut club.members, username, || "User is not a member".to_string())
}

pub fn add_attendee(event: &mut Event, username: &str) -> AppResult<()> {
    insert(&mut event.attendees, username, || "User is already an attendee".to_string())
}

pub fn remove_attendee(event: &mut Event, username: &str) -> AppResult<()> {
    remove(&mut event.attendees, username, || "User is not an attendee".to_string())
}

pub fn join_club(user: &mut User, club_id: &str) -> AppResult<()> {
    insert(&mut user.clubs, club_id, || format!("Already a member of club {}", club_id))
}

pub fn leave_club(user: &mut User, club_id: &str) -> AppResult<()> {
    remove(&mut user.clubs, club_id, || format!("Not a member of club {}", club_id))
}

pub fn join_event(user: &mut User, event_id: &str) -> AppResult<()> {
    insert(&mut user.events, event_id, || format!("Already attending event {}", event_id))
}

pub fn leave_event(user: &mut User, event_id: &str) -> AppResult<()> {
    remove(&mut user.events, event_id, || format!("Not attending event {}", event_id))
}

/// Adds `value` if absent. Returns whether the set changed.
pub fn mirror_insert(set: &mut Vec<String>, value: &str) -> bool {
    if set.iter().any(|v| v == value) {
        false
    } else {
        set.push(value.to_string());
        true
    }
}

/// Removes every occurrence of `value`. Returns whether the set changed.
pub fn mirror_remove(set: &mut Vec<String>, value: &str) -> bool {
    let before = set.len();
    set.retain(|v| v != value);
    set.len() != before
}

/// Appends to `recentActivity`, evicting the oldest entries past the cap.
pub fn push_activity(user: &mut User, input: ActivityInput) {
    user.recent_activity.push(ActivityEntry {
        date: Utc::now(),
        action: input.action,
        target: input.target,
        details: input.details,
    });
    let overflow = user.recent_activity.len().saturating_sub(MAX_RECENT_ACTIVITY);
    if overflow > 0 {
        user.recent_activity.drain(..overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capacity, Role};
    use chrono::NaiveDate;

    fn club() -> Club {
        Club::new("1".into(), "Chess".into(), "Games".into(), "owner")
    }

    fn event() -> Event {
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        Event {
            id: "7".into(),
            title: "Open night".into(),
            description: String::new(),
            club: None,
            category: String::new(),
            start_date: day.and_hms_opt(18, 0, 0),
            end_date: day.and_hms_opt(20, 0, 0),
            location: String::new(),
            capacity: Capacity::Unlimited,
            requires_registration: false,
            image: None,
            attendees: vec!["owner".into()],
            created_by: "owner".into(),
            created_at: Utc::now(),
            updated_at: None,
            updated_by: None,
        }
    }

    fn activity(n: usize) -> ActivityInput {
        ActivityInput {
            action: format!("action-{}", n),
            target: None,
            details: None,
        }
    }

    #[test]
    fn duplicate_add_member_conflicts_and_keeps_one_copy() {
        let mut club = club();
        add_member(&mut club, "ana").unwrap();

        let err = add_member(&mut club, "ana").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(club.members.iter().filter(|m| *m == "ana").count(), 1);

        // retrying against the resulting state fails the same way
        assert!(matches!(add_member(&mut club, "ana"), Err(AppError::Conflict(_))));
    }

    #[test]
    fn remove_missing_attendee_is_not_found_and_leaves_set_untouched() {
        let mut event = event();
        let before = event.attendees.clone();

        let err = remove_attendee(&mut event, "ghost").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(event.attendees, before);
    }

    #[test]
    fn add_then_remove_restores_the_set() {
        let mut event = event();
        add_attendee(&mut event, "ana").unwrap();
        assert_eq!(event.attendees, vec!["owner", "ana"]);
        remove_attendee(&mut event, "ana").unwrap();
        assert_eq!(event.attendees, vec!["owner"]);
        assert!(matches!(remove_attendee(&mut event, "ana"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn user_side_operations_follow_the_same_contract() {
        let mut user = User::new("ana".into(), "h".into(), Role::User);

        join_club(&mut user, "1").unwrap();
        assert!(matches!(join_club(&mut user, "1"), Err(AppError::Conflict(_))));
        leave_club(&mut user, "1").unwrap();
        assert!(matches!(leave_club(&mut user, "1"), Err(AppError::NotFound(_))));

        join_event(&mut user, "7").unwrap();
        assert!(matches!(join_event(&mut user, "7"), Err(AppError::Conflict(_))));
        leave_event(&mut user, "7").unwrap();
        assert!(user.events.is_empty());
    }

    #[test]
    fn removing_a_member_keeps_the_order_of_the_rest() {
        let mut club = club();
        for name in ["a", "b", "c"] {
            add_member(&mut club, name).unwrap();
        }
        remove_member(&mut club, "b").unwrap();
        assert_eq!(club.members, vec!["owner", "a", "c"]);
    }

    #[test]
    fn mirror_operations_are_lenient() {
        let mut set = vec!["1".to_string()];
        assert!(!mirror_insert(&mut set, "1"));
        assert!(mirror_insert(&mut set, "2"));
        assert!(mirror_remove(&mut set, "1"));
        assert!(!mirror_remove(&mut set, "1"));
        assert_eq!(set, vec!["2"]);
    }

    #[test]
    fn recent_activity_is_capped_at_ten_and_drops_the_oldest() {
        let mut user = User::new("ana".into(), "h".into(), Role::User);
        for n in 1..=11 {
            push_activity(&mut user, activity(n));
            assert!(user.recent_activity.len() <= MAX_RECENT_ACTIVITY);
        }

        let actions: Vec<_> = user.recent_activity.iter().map(|a| a.action.as_str()).collect();
        let expected: Vec<String> = (2..=11).map(|n| format!("action-{}", n)).collect();
        assert_eq!(actions, expected);
    }
}
