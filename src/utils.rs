//! Utility functions for the rating service

use chrono::{Local, NaiveDateTime, Timelike};
use uuid::Uuid;

/// Length of a freshly minted session id
pub const SESSION_ID_LENGTH: usize = 8;

/// Characters shown before an id is elided in listings
const DISPLAY_ID_LENGTH: usize = 6;

/// Generate a new anonymous session id: 8 lowercase alphanumeric characters
pub fn generate_session_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SESSION_ID_LENGTH)
        .collect()
}

/// Current local time truncated to whole seconds, the precision history
/// timestamps are stored with
pub fn current_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Shorten an id for display: the first six characters followed by "..."
pub fn abbreviate_user_id(user_id: &str) -> String {
    if user_id.chars().count() > DISPLAY_ID_LENGTH {
        let prefix: String = user_id.chars().take(DISPLAY_ID_LENGTH).collect();
        format!("{}...", prefix)
    } else {
        user_id.to_string()
    }
}
