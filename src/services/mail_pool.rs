use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::db::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

/// Records menu-position changes into the mail pool for the next digest.
pub struct MailPoolTracker;

impl MailPoolTracker {
    /// Insert-or-skip: only the first change of a position per day is kept.
    /// Best-effort, a store failure is logged and reported as "not recorded".
    pub async fn record(store: &dyn Store, position_id: i32, day: NaiveDate, kind: ChangeKind) -> bool {
        match store
            .record_change(position_id, day, kind == ChangeKind::Updated)
            .await
        {
            Ok(true) => {
                debug!("Mail pool: recorded {:?} of position {} on {}", kind, position_id, day);
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("Mail pool: failed to record change of position {}: {}", position_id, e);
                false
            }
        }
    }
}
