use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use emenu_api::{
    config::Config,
    db::{self, PgStore, Store},
    routes,
    services::{digest::DigestMailer, digest_scheduler, email::EmailService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let mailer: Option<Arc<dyn DigestMailer>> = match EmailService::new(&config) {
        Some(email) => {
            info!("SMTP email service configured");
            Some(Arc::new(email))
        }
        None => {
            info!("SMTP not configured, the daily digest will only clear pending changes");
            None
        }
    };

    digest_scheduler::start(store.clone(), mailer, config.clone());
    info!(
        "Digest scheduled daily at {} (UTC{})",
        config.digest_send_time.format("%H:%M"),
        config.scheduler_offset
    );

    let app = routes::router(AppState {
        store,
        config: config.clone(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    info!("eMenu API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
