use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::services::digest::{DigestMailer, DigestService};

/// Spawn a background task that sleeps until `digest_send_time` (in the
/// configured offset) and runs the daily digest, once per day.
pub fn start(store: Arc<dyn Store>, mailer: Option<Arc<dyn DigestMailer>>, config: Arc<Config>) {
    tokio::spawn(async move {
        loop {
            let wait = until_next_run(config.local_now(), config.digest_send_time);
            info!("Digest scheduler: next run in {}s", wait.as_secs());
            tokio::time::sleep(wait).await;

            let today = config.today();
            match DigestService::run(store.as_ref(), mailer.as_deref(), &config.currency, today).await {
                Ok(report) => info!(
                    "Digest: {} new, {} updated, {} email(s) sent, {} row(s) purged",
                    report.created, report.updated, report.sent, report.purged
                ),
                Err(e) => warn!("Digest run failed, pending changes kept for the next run: {}", e),
            }
        }
    });
}

/// Time left until the next occurrence of `at`; a run due right now is
/// scheduled for tomorrow.
pub fn until_next_run(now: DateTime<FixedOffset>, at: NaiveTime) -> Duration {
    let now = now.naive_local();
    let mut next = now.date().and_time(at);
    if next <= now {
        next += TimeDelta::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}
