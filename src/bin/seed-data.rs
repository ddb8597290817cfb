//! Development seed script
//!
//! Inserts two users, a catalogue of menu positions and three menus through the
//! regular services, so every position lands in the mail pool like an API
//! write would.
//!
//! Usage:
//!   DATABASE_URL=... ./seed-data [--reset] [--backdate-changes]
//!
//!   --reset             Empty every table before seeding
//!   --backdate-changes  Move part of the mail pool to yesterday so the next
//!                       digest run has something to send

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use clap::Parser;

use emenu_api::{
    config::Config,
    db::{self, PgStore},
    error::AppError,
    models::{
        menu::{CreateMenuRequest, CreatePositionRequest},
        user::CreateUserRequest,
    },
    services::{auth::AuthService, menu::MenuService, positions::PositionService},
};

#[derive(Parser)]
#[command(name = "seed-data", about = "Seed the eMenu database with demo data")]
struct Args {
    #[arg(long)]
    reset: bool,

    #[arg(long)]
    backdate_changes: bool,
}

/// (login, email, password)
const USERS: &[(&str, &str, &str)] = &[
    ("admin", "admin@emenu.local", "admin"),
    ("user", "user@emenu.local", "user"),
];

/// (name, price, vegan)
const POSITIONS: &[(&str, f64, bool)] = &[
    ("Pizza", 10.0, false),
    ("Pasta", 15.0, true),
    ("Salad", 5.0, true),
    ("Soup", 7.0, true),
    ("Cake", 20.0, false),
    ("Coffee", 3.0, true),
    ("Tea", 2.0, true),
    ("Beer", 4.0, true),
    ("Wine", 6.0, true),
    ("Water", 1.0, true),
    ("Juice", 3.0, true),
    ("Milk", 2.0, false),
    ("Bread", 3.0, false),
    ("Cheese", 4.0, false),
    ("Eggs", 3.0, false),
    ("Chicken", 6.0, false),
    ("Fish", 9.0, false),
    ("Fries", 3.0, false),
    ("Rice", 2.0, true),
    ("Pancakes", 5.0, false),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    println!("=== Seed eMenu ===");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    if args.reset {
        println!("Clearing tables...");
        sqlx::query(
            "TRUNCATE mail_pool, menu_menu_position, menu, menu_position, users RESTART IDENTITY CASCADE",
        )
        .execute(store.pool())
        .await?;
    }

    let today = config.today();

    // 1. Users
    for (login, email, password) in USERS {
        let req = CreateUserRequest {
            login: login.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        skip_existing(login, AuthService::create_user(&store, &req).await)?;
    }
    println!("  Users: {}", USERS.len());

    // 2. Positions
    let mut position_ids = Vec::with_capacity(POSITIONS.len());
    for (name, price, is_vegan) in POSITIONS {
        let req = CreatePositionRequest {
            name: name.to_string(),
            price: *price,
            description: Some(format!("Freshly made {}", name.to_lowercase())),
            preparation_time: (*price as i32).max(1),
            is_vegan: *is_vegan,
            menus: Vec::new(),
        };
        if let Some(position) = skip_existing(name, PositionService::create(&store, req, today).await)? {
            position_ids.push(position.id);
        }
    }
    println!("  Positions: {}", position_ids.len());

    // 3. Menus: odd picks, even picks, first and last
    let menus: [(&str, Vec<i32>); 3] = [
        ("Menu 1", position_ids.iter().skip(1).step_by(2).copied().collect()),
        ("Menu 2", position_ids.iter().step_by(2).copied().collect()),
        (
            "Menu 3",
            position_ids
                .first()
                .into_iter()
                .chain(position_ids.last().filter(|_| position_ids.len() > 1))
                .copied()
                .collect(),
        ),
    ];
    for (name, positions) in menus {
        let req = CreateMenuRequest {
            name: name.to_string(),
            positions,
        };
        skip_existing(name, MenuService::create(&store, &req).await)?;
    }
    println!("  Menus: 3");

    if args.backdate_changes {
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .context("Date out of range")?;
        let moved = backdate_changes(&store, today, yesterday).await?;
        println!("  Mail pool rows moved to {yesterday}: {moved}");
    }

    println!("Done.");
    Ok(())
}

/// Unique-name conflicts from a previous seed are not fatal.
fn skip_existing<T>(what: &str, result: Result<T, AppError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::Conflict(_)) => {
            println!("  Skipping '{what}': already exists");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to seed '{what}'")),
    }
}

/// Every fifth row of today goes to yesterday; every tenth is also flagged as
/// an update.
async fn backdate_changes(store: &PgStore, today: NaiveDate, yesterday: NaiveDate) -> Result<u64> {
    let moved = sqlx::query(
        "UPDATE mail_pool SET date = $2, updated = (id % 10 = 0)
         WHERE date = $1 AND id % 5 = 0",
    )
    .bind(today)
    .bind(yesterday)
    .execute(store.pool())
    .await?
    .rows_affected();
    Ok(moved)
}
