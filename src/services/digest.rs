use std::collections::BTreeSet;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};

use crate::{db::Store, error::AppError, models::menu::MenuPosition};

pub const DIGEST_SUBJECT: &str = "eMenu - Daily update";

/// Outbound transport for the daily digest.
#[async_trait]
pub trait DigestMailer: Send + Sync {
    async fn send_plain(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub created: usize,
    pub updated: usize,
    /// Number of messages handed to the mailer.
    pub sent: usize,
    pub purged: u64,
}

pub struct DigestService;

impl DigestService {
    /// Mail every user the positions created or updated before `today`, then
    /// purge the rows that were read. Users whose address does not parse are
    /// skipped. A send failure aborts before the purge so the same rows are
    /// picked up by the next run.
    pub async fn run(
        store: &dyn Store,
        mailer: Option<&dyn DigestMailer>,
        currency: &str,
        today: NaiveDate,
    ) -> Result<DigestReport, AppError> {
        let up_to = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| anyhow::anyhow!("No day before {today}"))?;
        let entries = store.pending_changes(up_to).await?;
        let row_ids: Vec<i32> = entries.iter().map(|e| e.id).collect();
        if entries.is_empty() {
            return Ok(DigestReport::default());
        }

        let mut report = DigestReport::default();
        if let Some(mailer) = mailer {
            let created_ids: BTreeSet<i32> = entries
                .iter()
                .filter(|e| !e.updated)
                .map(|e| e.position_id)
                .collect();
            let updated_ids: BTreeSet<i32> = entries
                .iter()
                .filter(|e| e.updated && !created_ids.contains(&e.position_id))
                .map(|e| e.position_id)
                .collect();

            let created = resolve(store, &created_ids).await?;
            let updated = resolve(store, &updated_ids).await?;
            report.created = created.len();
            report.updated = updated.len();

            if !created.is_empty() || !updated.is_empty() {
                let body = compose_body(&created, &updated, currency);
                for user in store.list_users().await? {
                    if user.email.parse::<lettre::Address>().is_err() {
                        warn!("Digest: skipping user {} with unusable address {:?}", user.login, user.email);
                        continue;
                    }
                    mailer
                        .send_plain(&user.email, DIGEST_SUBJECT, &body)
                        .await
                        .with_context(|| format!("Failed to send digest to {}", user.email))?;
                    report.sent += 1;
                }
            }
        } else {
            info!("Digest: SMTP not configured, clearing {} pending change(s)", entries.len());
        }

        report.purged = store.purge_changes(&row_ids).await?;
        Ok(report)
    }
}

async fn resolve(store: &dyn Store, ids: &BTreeSet<i32>) -> Result<Vec<MenuPosition>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = ids.iter().copied().collect();
    store.positions_by_ids(&ids).await
}

pub fn compose_body(created: &[MenuPosition], updated: &[MenuPosition], currency: &str) -> String {
    format!(
        "Hello,\n\n\
         Here are the new and updated menu positions:\n\n\
         New:\n{}\n\
         Updated:\n{}\n\n\
         Have a nice day!\n\
         eMenu",
        bullet_list(created, currency),
        bullet_list(updated, currency),
    )
}

fn bullet_list(positions: &[MenuPosition], currency: &str) -> String {
    if positions.is_empty() {
        return "* none".to_string();
    }
    positions
        .iter()
        .map(|p| format!("* {} - {:.2} {}", p.name, p.price, currency))
        .collect::<Vec<_>>()
        .join("\n")
}
