use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{
    missing_ids, HealthCheck, MailPoolRepository, MenuRepository, PositionRepository, UserRepository,
};
use crate::{
    error::AppError,
    models::{
        mail_pool::MailPoolEntry,
        menu::{
            Menu, MenuChanges, MenuFilter, MenuPosition, MenuSort, PositionChanges, PositionDraft,
            PositionFilter,
        },
        user::{NewUser, User},
    },
};

const MENU_COLUMNS: &str = "id, name, created_at, updated_at";
const POSITION_COLUMNS: &str =
    "id, name, price, description, preparation_time, is_vegan, created_at, updated_at";
const USER_COLUMNS: &str = "id, login, password, email, created_at, updated_at";

/// `Store` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct LinkedPosition {
    menu_id: i32,
    #[sqlx(flatten)]
    position: MenuPosition,
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

async fn link_menu_to_positions(
    tx: &mut Transaction<'_, Postgres>,
    menu_id: i32,
    position_ids: &[i32],
) -> Result<(), AppError> {
    if position_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO menu_menu_position (menu_id, menu_position_id)
         SELECT $1, UNNEST($2::int4[])
         ON CONFLICT DO NOTHING",
    )
    .bind(menu_id)
    .bind(position_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn link_position_to_menus(
    tx: &mut Transaction<'_, Postgres>,
    position_id: i32,
    menu_ids: &[i32],
) -> Result<(), AppError> {
    if menu_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO menu_menu_position (menu_id, menu_position_id)
         SELECT UNNEST($1::int4[]), $2
         ON CONFLICT DO NOTHING",
    )
    .bind(menu_ids)
    .bind(position_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for PgStore {
    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<Menu>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT m.id, m.name, m.created_at, m.updated_at
             FROM menu m
             LEFT JOIN menu_menu_position mp ON mp.menu_id = m.id
             WHERE TRUE",
        );
        if let Some(name) = &filter.name {
            qb.push(" AND m.name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND m.created_at >= ").push_bind(after);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND m.created_at <= ").push_bind(before);
        }
        if let Some(after) = filter.updated_after {
            qb.push(" AND m.updated_at >= ").push_bind(after);
        }
        if let Some(before) = filter.updated_before {
            qb.push(" AND m.updated_at <= ").push_bind(before);
        }
        qb.push(" GROUP BY m.id");
        match filter.sort {
            MenuSort::Name => qb.push(" ORDER BY lower(m.name) COLLATE \"C\", m.id"),
            MenuSort::PositionsCount => {
                qb.push(" ORDER BY COUNT(mp.menu_position_id) DESC, lower(m.name) COLLATE \"C\", m.id")
            }
        };

        let menus = qb.build_query_as::<Menu>().fetch_all(&self.pool).await?;
        Ok(menus)
    }

    async fn get_menu(&self, id: i32) -> Result<Option<Menu>, AppError> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn positions_for_menus(
        &self,
        menu_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<MenuPosition>>, AppError> {
        if menu_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, LinkedPosition>(
            "SELECT mp.menu_id, p.id, p.name, p.price, p.description, p.preparation_time,
                    p.is_vegan, p.created_at, p.updated_at
             FROM menu_menu_position mp
             JOIN menu_position p ON p.id = mp.menu_position_id
             WHERE mp.menu_id = ANY($1)
             ORDER BY lower(p.name) COLLATE \"C\", p.id",
        )
        .bind(menu_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<MenuPosition>> = HashMap::new();
        for row in rows {
            grouped.entry(row.menu_id).or_default().push(row.position);
        }
        Ok(grouped)
    }

    async fn create_menu(&self, name: &str, position_ids: &[i32]) -> Result<Menu, AppError> {
        let mut tx = self.pool.begin().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "INSERT INTO menu (name) VALUES ($1) RETURNING {MENU_COLUMNS}"
        ))
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        link_menu_to_positions(&mut tx, menu.id, position_ids).await?;
        tx.commit().await?;
        Ok(menu)
    }

    async fn update_menu(&self, id: i32, changes: &MenuChanges) -> Result<Option<Menu>, AppError> {
        let mut tx = self.pool.begin().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "UPDATE menu
             SET name = COALESCE($1, name),
                 updated_at = NOW()
             WHERE id = $2
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(menu) = menu else {
            return Ok(None);
        };

        if let Some(position_ids) = &changes.position_ids {
            sqlx::query("DELETE FROM menu_menu_position WHERE menu_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_menu_to_positions(&mut tx, id, position_ids).await?;
        }
        tx.commit().await?;
        Ok(Some(menu))
    }

    async fn delete_menu(&self, id: i32) -> Result<Option<Menu>, AppError> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "DELETE FROM menu WHERE id = $1 RETURNING {MENU_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn link_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO menu_menu_position (menu_id, menu_position_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(menu_id)
        .bind(position_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn unlink_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM menu_menu_position WHERE menu_id = $1 AND menu_position_id = $2",
        )
        .bind(menu_id)
        .bind(position_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn missing_menus(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<i32> = sqlx::query_scalar("SELECT id FROM menu WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(missing_ids(ids, &found))
    }
}

#[async_trait]
impl PositionRepository for PgStore {
    async fn list_positions(&self, filter: &PositionFilter) -> Result<Vec<MenuPosition>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {POSITION_COLUMNS} FROM menu_position WHERE TRUE"
        ));
        if let Some(name) = &filter.name {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(is_vegan) = filter.is_vegan {
            qb.push(" AND is_vegan = ").push_bind(is_vegan);
        }
        qb.push(" ORDER BY lower(name) COLLATE \"C\", id");

        let positions = qb
            .build_query_as::<MenuPosition>()
            .fetch_all(&self.pool)
            .await?;
        Ok(positions)
    }

    async fn get_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError> {
        let position = sqlx::query_as::<_, MenuPosition>(&format!(
            "SELECT {POSITION_COLUMNS} FROM menu_position WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(position)
    }

    async fn positions_by_ids(&self, ids: &[i32]) -> Result<Vec<MenuPosition>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let positions = sqlx::query_as::<_, MenuPosition>(&format!(
            "SELECT {POSITION_COLUMNS} FROM menu_position WHERE id = ANY($1) ORDER BY lower(name) COLLATE \"C\", id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(positions)
    }

    async fn missing_positions(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<i32> = sqlx::query_scalar("SELECT id FROM menu_position WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(missing_ids(ids, &found))
    }

    async fn create_position(
        &self,
        draft: &PositionDraft,
        menu_ids: &[i32],
    ) -> Result<MenuPosition, AppError> {
        let mut tx = self.pool.begin().await?;
        let position = sqlx::query_as::<_, MenuPosition>(&format!(
            "INSERT INTO menu_position (name, price, description, preparation_time, is_vegan)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {POSITION_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(draft.price)
        .bind(&draft.description)
        .bind(draft.preparation_time)
        .bind(draft.is_vegan)
        .fetch_one(&mut *tx)
        .await?;
        link_position_to_menus(&mut tx, position.id, menu_ids).await?;
        tx.commit().await?;
        Ok(position)
    }

    async fn update_position(
        &self,
        id: i32,
        changes: &PositionChanges,
    ) -> Result<Option<MenuPosition>, AppError> {
        let mut tx = self.pool.begin().await?;
        let position = sqlx::query_as::<_, MenuPosition>(&format!(
            "UPDATE menu_position
             SET name = COALESCE($1, name),
                 price = COALESCE($2, price),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 preparation_time = COALESCE($5, preparation_time),
                 is_vegan = COALESCE($6, is_vegan),
                 updated_at = NOW()
             WHERE id = $7
             RETURNING {POSITION_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(changes.price)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.preparation_time)
        .bind(changes.is_vegan)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(position) = position else {
            return Ok(None);
        };

        if let Some(menu_ids) = &changes.menu_ids {
            sqlx::query("DELETE FROM menu_menu_position WHERE menu_position_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_position_to_menus(&mut tx, id, menu_ids).await?;
        }
        tx.commit().await?;
        Ok(Some(position))
    }

    async fn delete_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError> {
        let position = sqlx::query_as::<_, MenuPosition>(&format!(
            "DELETE FROM menu_position WHERE id = $1 RETURNING {POSITION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(position)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, login, password, email)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY login COLLATE \"C\""
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MailPoolRepository for PgStore {
    async fn record_change(
        &self,
        position_id: i32,
        date: NaiveDate,
        updated: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO mail_pool (position_id, date, updated)
             VALUES ($1, $2, $3)
             ON CONFLICT (position_id, date) DO NOTHING",
        )
        .bind(position_id)
        .bind(date)
        .bind(updated)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn pending_changes(&self, up_to: NaiveDate) -> Result<Vec<MailPoolEntry>, AppError> {
        let entries = sqlx::query_as::<_, MailPoolEntry>(
            "SELECT id, position_id, date, updated
             FROM mail_pool
             WHERE date <= $1
             ORDER BY date, id",
        )
        .bind(up_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn purge_changes(&self, ids: &[i32]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM mail_pool WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
