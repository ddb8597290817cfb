#[cfg(test)]
pub mod memory;
pub mod postgres;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        mail_pool::MailPoolEntry,
        menu::{Menu, MenuChanges, MenuFilter, MenuPosition, PositionChanges, PositionDraft, PositionFilter},
        user::{NewUser, User},
    },
};

pub use postgres::PgStore;

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<Menu>, AppError>;

    async fn get_menu(&self, id: i32) -> Result<Option<Menu>, AppError>;

    /// Positions linked to each of the given menus, ordered by position name.
    /// Menus without positions are absent from the map.
    async fn positions_for_menus(
        &self,
        menu_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<MenuPosition>>, AppError>;

    async fn create_menu(&self, name: &str, position_ids: &[i32]) -> Result<Menu, AppError>;

    async fn update_menu(&self, id: i32, changes: &MenuChanges) -> Result<Option<Menu>, AppError>;

    async fn delete_menu(&self, id: i32) -> Result<Option<Menu>, AppError>;

    /// Returns false when the link already existed.
    async fn link_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError>;

    /// Returns false when there was no such link.
    async fn unlink_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError>;

    /// Ids from `ids` that do not match any menu.
    async fn missing_menus(&self, ids: &[i32]) -> Result<Vec<i32>, AppError>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn list_positions(&self, filter: &PositionFilter) -> Result<Vec<MenuPosition>, AppError>;

    async fn get_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError>;

    async fn positions_by_ids(&self, ids: &[i32]) -> Result<Vec<MenuPosition>, AppError>;

    /// Ids from `ids` that do not match any position.
    async fn missing_positions(&self, ids: &[i32]) -> Result<Vec<i32>, AppError>;

    async fn create_position(
        &self,
        draft: &PositionDraft,
        menu_ids: &[i32],
    ) -> Result<MenuPosition, AppError>;

    async fn update_position(
        &self,
        id: i32,
        changes: &PositionChanges,
    ) -> Result<Option<MenuPosition>, AppError>;

    /// Join rows and mail-pool rows of the position go with it.
    async fn delete_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn count_users(&self) -> Result<i64, AppError>;
}

#[async_trait]
pub trait MailPoolRepository: Send + Sync {
    /// Insert-or-skip on (position_id, date). Returns true when a row was written.
    async fn record_change(
        &self,
        position_id: i32,
        date: NaiveDate,
        updated: bool,
    ) -> Result<bool, AppError>;

    /// Entries dated on or before `up_to`, oldest first.
    async fn pending_changes(&self, up_to: NaiveDate) -> Result<Vec<MailPoolEntry>, AppError>;

    async fn purge_changes(&self, ids: &[i32]) -> Result<u64, AppError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

/// Everything the API and the digest job need from persistence.
pub trait Store:
    MenuRepository + PositionRepository + UserRepository + MailPoolRepository + HealthCheck
{
}

impl<T> Store for T where
    T: MenuRepository + PositionRepository + UserRepository + MailPoolRepository + HealthCheck
{
}

/// Requested ids (deduplicated, ascending) that are not in `found`.
pub(crate) fn missing_ids(requested: &[i32], found: &[i32]) -> Vec<i32> {
    let found: BTreeSet<i32> = found.iter().copied().collect();
    requested
        .iter()
        .copied()
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .filter(|id| !found.contains(id))
        .collect()
}
