use crate::{
    db::Store,
    error::AppError,
    models::menu::{CreateMenuRequest, Menu, MenuChanges, MenuFilter, MenuResponse},
};

pub struct MenuService;

impl MenuService {
    pub async fn list(store: &dyn Store, filter: &MenuFilter) -> Result<Vec<MenuResponse>, AppError> {
        let menus = store.list_menus(filter).await?;
        let ids: Vec<i32> = menus.iter().map(|m| m.id).collect();
        let mut positions = store.positions_for_menus(&ids).await?;

        Ok(menus
            .into_iter()
            .map(|menu| {
                let linked = positions.remove(&menu.id).unwrap_or_default();
                MenuResponse::new(menu, linked)
            })
            .collect())
    }

    pub async fn get(store: &dyn Store, id: i32) -> Result<MenuResponse, AppError> {
        let menu = find_menu(store, id).await?;
        with_positions(store, menu).await
    }

    pub async fn create(store: &dyn Store, req: &CreateMenuRequest) -> Result<MenuResponse, AppError> {
        ensure_positions_exist(store, &req.positions).await?;
        let menu = store.create_menu(&req.name, &req.positions).await?;
        with_positions(store, menu).await
    }

    /// Used by both PUT and PATCH; `changes.position_ids` replaces the link set.
    pub async fn update(
        store: &dyn Store,
        id: i32,
        changes: &MenuChanges,
    ) -> Result<MenuResponse, AppError> {
        if let Some(position_ids) = &changes.position_ids {
            ensure_positions_exist(store, position_ids).await?;
        }
        let menu = store
            .update_menu(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Menu"))?;
        with_positions(store, menu).await
    }

    /// Returns the menu as it was, positions included.
    pub async fn delete(store: &dyn Store, id: i32) -> Result<MenuResponse, AppError> {
        let snapshot = Self::get(store, id).await?;
        store
            .delete_menu(id)
            .await?
            .ok_or_else(|| AppError::not_found("Menu"))?;
        Ok(snapshot)
    }

    pub async fn add_position(
        store: &dyn Store,
        menu_id: i32,
        position_id: i32,
    ) -> Result<MenuResponse, AppError> {
        let menu = find_menu(store, menu_id).await?;
        if store.get_position(position_id).await?.is_none() {
            return Err(AppError::not_found("Menu position"));
        }
        if !store.link_position(menu_id, position_id).await? {
            return Err(AppError::Conflict("Position already in menu".into()));
        }
        with_positions(store, menu).await
    }

    pub async fn remove_position(
        store: &dyn Store,
        menu_id: i32,
        position_id: i32,
    ) -> Result<MenuResponse, AppError> {
        let menu = find_menu(store, menu_id).await?;
        if store.get_position(position_id).await?.is_none() {
            return Err(AppError::not_found("Menu position"));
        }
        if !store.unlink_position(menu_id, position_id).await? {
            return Err(AppError::NotFound("Position is not part of this menu".into()));
        }
        with_positions(store, menu).await
    }
}

async fn find_menu(store: &dyn Store, id: i32) -> Result<Menu, AppError> {
    store
        .get_menu(id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))
}

async fn with_positions(store: &dyn Store, menu: Menu) -> Result<MenuResponse, AppError> {
    let positions = store
        .positions_for_menus(&[menu.id])
        .await?
        .remove(&menu.id)
        .unwrap_or_default();
    Ok(MenuResponse::new(menu, positions))
}

async fn ensure_positions_exist(store: &dyn Store, ids: &[i32]) -> Result<(), AppError> {
    let missing = store.missing_positions(ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Menu positions not found: {missing:?}")))
    }
}
