use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

const MAX_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1024;

/// A single sellable item (dish or drink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MenuPosition {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    /// Minutes.
    pub preparation_time: i32,
    pub is_vegan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DB row for `menu`; positions are loaded separately from the join table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuResponse {
    pub id: i32,
    pub name: String,
    pub positions: Vec<MenuPosition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuResponse {
    pub fn new(menu: Menu, positions: Vec<MenuPosition>) -> Self {
        Self {
            id: menu.id,
            name: menu.name,
            positions,
            created_at: menu.created_at,
            updated_at: menu.updated_at,
        }
    }
}

// ─── Menu requests ──────────────────────────────────────────────────────────

/// Body for POST /api/admin/menu.
#[derive(Debug, Deserialize)]
pub struct CreateMenuRequest {
    pub name: String,
    #[serde(default)]
    pub positions: Vec<i32>,
}

/// Body for PUT /api/admin/menu/{id}; replaces the position set.
#[derive(Debug, Deserialize)]
pub struct UpdateMenuRequest {
    pub name: String,
    pub positions: Vec<i32>,
}

/// Body for PATCH /api/admin/menu/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct PatchMenuRequest {
    pub name: Option<String>,
    pub positions: Option<Vec<i32>>,
}

impl CreateMenuRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)
    }
}

impl UpdateMenuRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)
    }
}

impl PatchMenuRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }
}

/// Partial update applied by the store. `position_ids`, when set, replaces
/// every link of the menu.
#[derive(Debug, Clone, Default)]
pub struct MenuChanges {
    pub name: Option<String>,
    pub position_ids: Option<Vec<i32>>,
}

impl From<UpdateMenuRequest> for MenuChanges {
    fn from(req: UpdateMenuRequest) -> Self {
        Self {
            name: Some(req.name),
            position_ids: Some(req.positions),
        }
    }
}

impl From<PatchMenuRequest> for MenuChanges {
    fn from(req: PatchMenuRequest) -> Self {
        Self {
            name: req.name,
            position_ids: req.positions,
        }
    }
}

// ─── Position requests ──────────────────────────────────────────────────────

/// Body for POST /api/admin/menu/menu_position.
#[derive(Debug, Deserialize)]
pub struct CreatePositionRequest {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub preparation_time: i32,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub menus: Vec<i32>,
}

/// Body for PUT /api/admin/menu/menu_position/{id}. A null description clears it.
#[derive(Debug, Deserialize)]
pub struct UpdatePositionRequest {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub preparation_time: i32,
    pub is_vegan: bool,
    pub menus: Vec<i32>,
}

/// Body for PATCH /api/admin/menu/menu_position/{id}. Null fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PatchPositionRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub preparation_time: Option<i32>,
    pub is_vegan: Option<bool>,
    pub menus: Option<Vec<i32>>,
}

impl CreatePositionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_description(self.description.as_deref())?;
        validate_preparation_time(self.preparation_time)
    }
}

impl UpdatePositionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_description(self.description.as_deref())?;
        validate_preparation_time(self.preparation_time)
    }
}

impl PatchPositionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        validate_description(self.description.as_deref())?;
        if let Some(minutes) = self.preparation_time {
            validate_preparation_time(minutes)?;
        }
        Ok(())
    }
}

/// Columns of a new position row.
#[derive(Debug, Clone)]
pub struct PositionDraft {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub preparation_time: i32,
    pub is_vegan: bool,
}

impl CreatePositionRequest {
    /// Split into the row to insert and the menus to link it to.
    pub fn into_parts(self) -> (PositionDraft, Vec<i32>) {
        (
            PositionDraft {
                name: self.name,
                price: self.price,
                description: self.description,
                preparation_time: self.preparation_time,
                is_vegan: self.is_vegan,
            },
            self.menus,
        )
    }
}

/// Partial update applied by the store. `description: Some(None)` clears the
/// column; `menu_ids`, when set, replaces every link of the position.
#[derive(Debug, Clone, Default)]
pub struct PositionChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<Option<String>>,
    pub preparation_time: Option<i32>,
    pub is_vegan: Option<bool>,
    pub menu_ids: Option<Vec<i32>>,
}

impl From<UpdatePositionRequest> for PositionChanges {
    fn from(req: UpdatePositionRequest) -> Self {
        Self {
            name: Some(req.name),
            price: Some(req.price),
            description: Some(req.description),
            preparation_time: Some(req.preparation_time),
            is_vegan: Some(req.is_vegan),
            menu_ids: Some(req.menus),
        }
    }
}

impl From<PatchPositionRequest> for PositionChanges {
    fn from(req: PatchPositionRequest) -> Self {
        Self {
            name: req.name,
            price: req.price,
            description: req.description.map(Some),
            preparation_time: req.preparation_time,
            is_vegan: req.is_vegan,
            menu_ids: req.menus,
        }
    }
}

// ─── Listing ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MenuSort {
    #[default]
    Name,
    /// Most positions first, ties by name.
    PositionsCount,
}

/// Raw query params for GET /api/menu. Parsed into [`MenuFilter`] so that bad
/// values surface as validation errors.
#[derive(Debug, Default, Deserialize)]
pub struct MenuListQuery {
    pub sortby: Option<String>,
    pub name: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub updated_after: Option<String>,
    pub updated_before: Option<String>,
}

/// Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    pub sort: MenuSort,
    pub name: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl TryFrom<MenuListQuery> for MenuFilter {
    type Error = AppError;

    fn try_from(query: MenuListQuery) -> Result<Self, Self::Error> {
        let sort = match query.sortby.as_deref() {
            None | Some("name") => MenuSort::Name,
            Some("positions_count") => MenuSort::PositionsCount,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "Unknown sort parameter '{other}', expected 'name' or 'positions_count'"
                )))
            }
        };
        if let Some(name) = &query.name {
            validate_name(name)?;
        }

        Ok(Self {
            sort,
            name: query.name,
            created_after: parse_bound("created_after", query.created_after)?,
            created_before: parse_bound("created_before", query.created_before)?,
            updated_after: parse_bound("updated_after", query.updated_after)?,
            updated_before: parse_bound("updated_before", query.updated_before)?,
        })
    }
}

/// Query params for GET /api/admin/menu/menu_position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionFilter {
    pub name: Option<String>,
    pub is_vegan: Option<bool>,
}

fn parse_bound(field: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|value| {
        parse_timestamp(&value).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid {field} '{value}', expected a date or datetime such as '2022-01-01T00:00:00'"
            ))
        })
    })
    .transpose()
}

/// Accepts RFC 3339, a naive datetime (read as UTC) or a plain date (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ─── Field rules ────────────────────────────────────────────────────────────

fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name must have between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation("price must be greater than 0".into()));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), AppError> {
    if let Some(text) = description {
        let len = text.chars().count();
        if len == 0 || len > MAX_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "description must have between 1 and {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }
    Ok(())
}

fn validate_preparation_time(minutes: i32) -> Result<(), AppError> {
    if minutes <= 0 {
        return Err(AppError::Validation(
            "preparation_time must be greater than 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pizza() -> CreatePositionRequest {
        CreatePositionRequest {
            name: "pizza".into(),
            price: 10.0,
            description: Some("test_description".into()),
            preparation_time: 10,
            is_vegan: false,
            menus: vec![],
        }
    }

    #[test]
    fn accepts_a_well_formed_position() {
        assert!(pizza().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_price_and_preparation_time() {
        let mut req = pizza();
        req.price = 0.0;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = pizza();
        req.preparation_time = -1;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = pizza();
        req.price = f64::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_empty_or_oversized_names() {
        let mut req = pizza();
        req.name = String::new();
        assert!(req.validate().is_err());

        req.name = "x".repeat(256);
        assert!(req.validate().is_err());

        req.name = "x".repeat(255);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn patch_with_nothing_set_is_valid() {
        assert!(PatchPositionRequest::default().validate().is_ok());
        assert!(PatchMenuRequest::default().validate().is_ok());
    }

    #[test]
    fn patch_description_never_clears() {
        let changes: PositionChanges = PatchPositionRequest::default().into();
        assert!(changes.description.is_none());

        let changes: PositionChanges = UpdatePositionRequest {
            name: "pizza".into(),
            price: 1.0,
            description: None,
            preparation_time: 1,
            is_vegan: true,
            menus: vec![],
        }
        .into();
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2022-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("2022-01-01T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2022-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2022-01-01T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn builds_filter_from_query() {
        let filter = MenuFilter::try_from(MenuListQuery {
            sortby: Some("positions_count".into()),
            created_after: Some("2021-12-31".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.sort, MenuSort::PositionsCount);
        assert!(filter.created_after.is_some());
        assert!(filter.created_before.is_none());
    }

    #[test]
    fn unknown_sort_is_a_validation_error() {
        let result = MenuFilter::try_from(MenuListQuery {
            sortby: Some("price".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
