use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Pending change of a menu position, waiting for the next digest.
/// At most one row exists per (position_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MailPoolEntry {
    pub id: i32,
    pub position_id: i32,
    pub date: NaiveDate,
    /// false when the first change of the day was the creation.
    pub updated: bool,
}
