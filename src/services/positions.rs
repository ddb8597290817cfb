use chrono::NaiveDate;

use crate::{
    db::Store,
    error::AppError,
    models::menu::{CreatePositionRequest, MenuPosition, PositionChanges, PositionFilter},
    services::mail_pool::{ChangeKind, MailPoolTracker},
};

pub struct PositionService;

impl PositionService {
    pub async fn list(store: &dyn Store, filter: &PositionFilter) -> Result<Vec<MenuPosition>, AppError> {
        store.list_positions(filter).await
    }

    pub async fn get(store: &dyn Store, id: i32) -> Result<MenuPosition, AppError> {
        store
            .get_position(id)
            .await?
            .ok_or_else(|| AppError::not_found("Menu position"))
    }

    /// `today` keys the mail-pool entry of the new position.
    pub async fn create(
        store: &dyn Store,
        req: CreatePositionRequest,
        today: NaiveDate,
    ) -> Result<MenuPosition, AppError> {
        let (draft, menu_ids) = req.into_parts();
        ensure_menus_exist(store, &menu_ids).await?;

        let position = store.create_position(&draft, &menu_ids).await?;
        MailPoolTracker::record(store, position.id, today, ChangeKind::Created).await;
        Ok(position)
    }

    /// Used by both PUT and PATCH.
    pub async fn update(
        store: &dyn Store,
        id: i32,
        changes: &PositionChanges,
        today: NaiveDate,
    ) -> Result<MenuPosition, AppError> {
        if let Some(menu_ids) = &changes.menu_ids {
            ensure_menus_exist(store, menu_ids).await?;
        }
        let position = store
            .update_position(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Menu position"))?;
        MailPoolTracker::record(store, position.id, today, ChangeKind::Updated).await;
        Ok(position)
    }

    pub async fn delete(store: &dyn Store, id: i32) -> Result<MenuPosition, AppError> {
        store
            .delete_position(id)
            .await?
            .ok_or_else(|| AppError::not_found("Menu position"))
    }
}

async fn ensure_menus_exist(store: &dyn Store, ids: &[i32]) -> Result<(), AppError> {
    let missing = store.missing_menus(ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Menus not found: {missing:?}")))
    }
}
