/// Run the daily digest once, outside the API's scheduler.
///
/// Usage: send-digest [--date YYYY-MM-DD] [--dry-run]
///   --date     : Day the run happens on; changes dated before it are sent (default: today)
///   --dry-run  : Print pending changes without mailing or purging

use anyhow::Context;
use chrono::{Days, NaiveDate};
use clap::Parser;

use emenu_api::{
    config::Config,
    db::{self, MailPoolRepository, PgStore},
    services::{
        digest::{DigestMailer, DigestService},
        email::EmailService,
    },
};

#[derive(Parser)]
#[command(name = "send-digest", about = "Send the eMenu daily digest now")]
struct Args {
    /// Day the run happens on (defaults to today in SCHEDULER_UTC_OFFSET)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Only list what would be sent
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    let today = args.date.unwrap_or_else(|| config.today());

    if args.dry_run {
        let up_to = today
            .checked_sub_days(Days::new(1))
            .context("Date out of range")?;
        let pending = store.pending_changes(up_to).await?;
        tracing::info!("{} pending change(s) dated on or before {}", pending.len(), up_to);
        for entry in pending {
            let kind = if entry.updated { "updated" } else { "created" };
            println!("{}  position {:>6}  {}", entry.date, entry.position_id, kind);
        }
        return Ok(());
    }

    let mailer = EmailService::new(&config);
    if mailer.is_none() {
        tracing::warn!("SMTP not configured, pending changes will be cleared without mailing");
    }

    let report = DigestService::run(
        &store,
        mailer.as_ref().map(|m| m as &dyn DigestMailer),
        &config.currency,
        today,
    )
    .await?;

    tracing::info!(
        "Digest done: {} new, {} updated, {} email(s) sent, {} row(s) purged",
        report.created,
        report.updated,
        report.sent,
        report.purged
    );

    Ok(())
}
