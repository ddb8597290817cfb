//! In-memory `Store` for tests. Mirrors the constraints of the PostgreSQL
//! schema: unique names/logins, unique (position_id, date) in the mail pool,
//! cascading deletes of join rows and mail-pool rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
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

#[derive(Default)]
struct Tables {
    menus: BTreeMap<i32, Menu>,
    positions: BTreeMap<i32, MenuPosition>,
    /// (menu_id, position_id)
    links: BTreeSet<(i32, i32)>,
    users: Vec<User>,
    mail_pool: BTreeMap<i32, MailPoolEntry>,
    next_menu_id: i32,
    next_position_id: i32,
    next_entry_id: i32,
}

impl Tables {
    fn position_name_taken(&self, name: &str, except: Option<i32>) -> bool {
        self.positions
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn menu_name_taken(&self, name: &str, except: Option<i32>) -> bool {
        self.menus
            .values()
            .any(|m| m.name == name && Some(m.id) != except)
    }

    fn check_menus_exist(&self, ids: &[i32]) -> Result<(), AppError> {
        if ids.iter().all(|id| self.menus.contains_key(id)) {
            Ok(())
        } else {
            Err(AppError::NotFound("Referenced object not found".into()))
        }
    }

    fn check_positions_exist(&self, ids: &[i32]) -> Result<(), AppError> {
        if ids.iter().all(|id| self.positions.contains_key(id)) {
            Ok(())
        } else {
            Err(AppError::NotFound("Referenced object not found".into()))
        }
    }

    fn positions_count(&self, menu_id: i32) -> usize {
        self.links.iter().filter(|(m, _)| *m == menu_id).count()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn conflict() -> AppError {
    AppError::Conflict("Object already exists".into())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Names sort case-insensitively, matching `lower(name) COLLATE "C"` in `PgStore`.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn sort_positions(positions: &mut [MenuPosition]) {
    positions.sort_by(|a, b| name_key(&a.name).cmp(&name_key(&b.name)).then(a.id.cmp(&b.id)));
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a menu with explicit timestamps.
    pub fn insert_menu_at(&self, name: &str, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Menu {
        let mut t = self.lock();
        t.next_menu_id += 1;
        let menu = Menu {
            id: t.next_menu_id,
            name: name.to_string(),
            created_at,
            updated_at,
        };
        t.menus.insert(menu.id, menu.clone());
        menu
    }

    /// Insert a position without touching the mail pool.
    pub fn insert_position(&self, name: &str, price: f64) -> MenuPosition {
        let mut t = self.lock();
        t.next_position_id += 1;
        let now = Utc::now();
        let position = MenuPosition {
            id: t.next_position_id,
            name: name.to_string(),
            price,
            description: Some("test_description".into()),
            preparation_time: 10,
            is_vegan: false,
            created_at: now,
            updated_at: now,
        };
        t.positions.insert(position.id, position.clone());
        position
    }

    pub fn mail_pool_rows(&self, position_id: i32) -> Vec<MailPoolEntry> {
        self.lock()
            .mail_pool
            .values()
            .filter(|e| e.position_id == position_id)
            .cloned()
            .collect()
    }

    pub fn mail_pool_len(&self) -> usize {
        self.lock().mail_pool.len()
    }

    pub fn position_count(&self) -> usize {
        self.lock().positions.len()
    }

    pub fn link_count(&self) -> usize {
        self.lock().links.len()
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<Menu>, AppError> {
        let t = self.lock();
        let mut menus: Vec<Menu> = t
            .menus
            .values()
            .filter(|m| filter.name.as_deref().map_or(true, |n| contains_ignore_case(&m.name, n)))
            .filter(|m| filter.created_after.map_or(true, |b| m.created_at >= b))
            .filter(|m| filter.created_before.map_or(true, |b| m.created_at <= b))
            .filter(|m| filter.updated_after.map_or(true, |b| m.updated_at >= b))
            .filter(|m| filter.updated_before.map_or(true, |b| m.updated_at <= b))
            .cloned()
            .collect();

        match filter.sort {
            MenuSort::Name => menus.sort_by(|a, b| {
                name_key(&a.name).cmp(&name_key(&b.name)).then(a.id.cmp(&b.id))
            }),
            MenuSort::PositionsCount => menus.sort_by(|a, b| {
                t.positions_count(b.id)
                    .cmp(&t.positions_count(a.id))
                    .then(name_key(&a.name).cmp(&name_key(&b.name)))
                    .then(a.id.cmp(&b.id))
            }),
        }
        Ok(menus)
    }

    async fn get_menu(&self, id: i32) -> Result<Option<Menu>, AppError> {
        Ok(self.lock().menus.get(&id).cloned())
    }

    async fn positions_for_menus(
        &self,
        menu_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<MenuPosition>>, AppError> {
        let t = self.lock();
        let mut grouped: HashMap<i32, Vec<MenuPosition>> = HashMap::new();
        for (menu_id, position_id) in &t.links {
            if menu_ids.contains(menu_id) {
                if let Some(position) = t.positions.get(position_id) {
                    grouped.entry(*menu_id).or_default().push(position.clone());
                }
            }
        }
        for positions in grouped.values_mut() {
            sort_positions(positions);
        }
        Ok(grouped)
    }

    async fn create_menu(&self, name: &str, position_ids: &[i32]) -> Result<Menu, AppError> {
        let mut t = self.lock();
        if t.menu_name_taken(name, None) {
            return Err(conflict());
        }
        t.check_positions_exist(position_ids)?;

        t.next_menu_id += 1;
        let now = Utc::now();
        let menu = Menu {
            id: t.next_menu_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.menus.insert(menu.id, menu.clone());
        for position_id in position_ids {
            t.links.insert((menu.id, *position_id));
        }
        Ok(menu)
    }

    async fn update_menu(&self, id: i32, changes: &MenuChanges) -> Result<Option<Menu>, AppError> {
        let mut t = self.lock();
        if !t.menus.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            if t.menu_name_taken(name, Some(id)) {
                return Err(conflict());
            }
        }
        if let Some(position_ids) = &changes.position_ids {
            t.check_positions_exist(position_ids)?;
            t.links.retain(|(m, _)| *m != id);
            for position_id in position_ids {
                t.links.insert((id, *position_id));
            }
        }

        let Some(menu) = t.menus.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            menu.name = name.clone();
        }
        menu.updated_at = Utc::now();
        Ok(Some(menu.clone()))
    }

    async fn delete_menu(&self, id: i32) -> Result<Option<Menu>, AppError> {
        let mut t = self.lock();
        let menu = t.menus.remove(&id);
        if menu.is_some() {
            t.links.retain(|(m, _)| *m != id);
        }
        Ok(menu)
    }

    async fn link_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError> {
        let mut t = self.lock();
        t.check_menus_exist(&[menu_id])?;
        t.check_positions_exist(&[position_id])?;
        Ok(t.links.insert((menu_id, position_id)))
    }

    async fn unlink_position(&self, menu_id: i32, position_id: i32) -> Result<bool, AppError> {
        Ok(self.lock().links.remove(&(menu_id, position_id)))
    }

    async fn missing_menus(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        let t = self.lock();
        let found: Vec<i32> = ids.iter().copied().filter(|id| t.menus.contains_key(id)).collect();
        Ok(missing_ids(ids, &found))
    }
}

#[async_trait]
impl PositionRepository for MemoryStore {
    async fn list_positions(&self, filter: &PositionFilter) -> Result<Vec<MenuPosition>, AppError> {
        let mut positions: Vec<MenuPosition> = self
            .lock()
            .positions
            .values()
            .filter(|p| filter.name.as_deref().map_or(true, |n| contains_ignore_case(&p.name, n)))
            .filter(|p| filter.is_vegan.map_or(true, |v| p.is_vegan == v))
            .cloned()
            .collect();
        sort_positions(&mut positions);
        Ok(positions)
    }

    async fn get_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError> {
        Ok(self.lock().positions.get(&id).cloned())
    }

    async fn positions_by_ids(&self, ids: &[i32]) -> Result<Vec<MenuPosition>, AppError> {
        let t = self.lock();
        let mut positions: Vec<MenuPosition> = t
            .positions
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        sort_positions(&mut positions);
        Ok(positions)
    }

    async fn missing_positions(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        let t = self.lock();
        let found: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| t.positions.contains_key(id))
            .collect();
        Ok(missing_ids(ids, &found))
    }

    async fn create_position(
        &self,
        draft: &PositionDraft,
        menu_ids: &[i32],
    ) -> Result<MenuPosition, AppError> {
        let mut t = self.lock();
        if t.position_name_taken(&draft.name, None) {
            return Err(conflict());
        }
        t.check_menus_exist(menu_ids)?;

        t.next_position_id += 1;
        let now = Utc::now();
        let position = MenuPosition {
            id: t.next_position_id,
            name: draft.name.clone(),
            price: draft.price,
            description: draft.description.clone(),
            preparation_time: draft.preparation_time,
            is_vegan: draft.is_vegan,
            created_at: now,
            updated_at: now,
        };
        t.positions.insert(position.id, position.clone());
        for menu_id in menu_ids {
            t.links.insert((*menu_id, position.id));
        }
        Ok(position)
    }

    async fn update_position(
        &self,
        id: i32,
        changes: &PositionChanges,
    ) -> Result<Option<MenuPosition>, AppError> {
        let mut t = self.lock();
        if !t.positions.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            if t.position_name_taken(name, Some(id)) {
                return Err(conflict());
            }
        }
        if let Some(menu_ids) = &changes.menu_ids {
            t.check_menus_exist(menu_ids)?;
            t.links.retain(|(_, p)| *p != id);
            for menu_id in menu_ids {
                t.links.insert((*menu_id, id));
            }
        }

        let Some(position) = t.positions.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            position.name = name.clone();
        }
        if let Some(price) = changes.price {
            position.price = price;
        }
        if let Some(description) = &changes.description {
            position.description = description.clone();
        }
        if let Some(minutes) = changes.preparation_time {
            position.preparation_time = minutes;
        }
        if let Some(is_vegan) = changes.is_vegan {
            position.is_vegan = is_vegan;
        }
        position.updated_at = Utc::now();
        Ok(Some(position.clone()))
    }

    async fn delete_position(&self, id: i32) -> Result<Option<MenuPosition>, AppError> {
        let mut t = self.lock();
        let position = t.positions.remove(&id);
        if position.is_some() {
            t.links.retain(|(_, p)| *p != id);
            t.mail_pool.retain(|_, e| e.position_id != id);
        }
        Ok(position)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.login == user.login) {
            return Err(conflict());
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            login: user.login.clone(),
            password: user.password_hash.clone(),
            email: user.email.clone(),
            created_at: now,
            updated_at: now,
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.lock().users.clone();
        users.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(users)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.login == login).cloned())
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.lock().users.len() as i64)
    }
}

#[async_trait]
impl MailPoolRepository for MemoryStore {
    async fn record_change(
        &self,
        position_id: i32,
        date: NaiveDate,
        updated: bool,
    ) -> Result<bool, AppError> {
        let mut t = self.lock();
        t.check_positions_exist(&[position_id])?;
        if t
            .mail_pool
            .values()
            .any(|e| e.position_id == position_id && e.date == date)
        {
            return Ok(false);
        }
        t.next_entry_id += 1;
        let entry = MailPoolEntry {
            id: t.next_entry_id,
            position_id,
            date,
            updated,
        };
        t.mail_pool.insert(entry.id, entry);
        Ok(true)
    }

    async fn pending_changes(&self, up_to: NaiveDate) -> Result<Vec<MailPoolEntry>, AppError> {
        let mut entries: Vec<MailPoolEntry> = self
            .lock()
            .mail_pool
            .values()
            .filter(|e| e.date <= up_to)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn purge_changes(&self, ids: &[i32]) -> Result<u64, AppError> {
        let mut t = self.lock();
        let before = t.mail_pool.len();
        t.mail_pool.retain(|id, _| !ids.contains(id));
        Ok((before - t.mail_pool.len()) as u64)
    }
}
