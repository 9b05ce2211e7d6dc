use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::menu::{Menu, MenuFields, MenuListQuery},
    services::date_window::utc_day_bounds,
};

const MENU_COLUMNS: &str = "id, main_dish, side_dish, dessert, preparation_date, weekday, \
                            meal_time, added_by, created_at, updated_at";

/// Path of a menu's detail resource, used for deep links.
pub fn menu_detail_path(id: Uuid) -> String {
    format!("/menus/{id}")
}

pub struct MenuService;

impl MenuService {
    /// All menus, optionally narrowed to a weekday and/or a local date.
    pub async fn list(pool: &PgPool, query: &MenuListQuery) -> anyhow::Result<Vec<Menu>> {
        let bounds: Option<(DateTime<Utc>, DateTime<Utc>)> =
            query.date.map(utc_day_bounds).transpose()?;
        let menus = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS}
             FROM menus
             WHERE ($1::SMALLINT IS NULL OR weekday = $1)
               AND ($2::TIMESTAMPTZ IS NULL OR preparation_date BETWEEN $2 AND $3)
             ORDER BY weekday DESC, preparation_date"
        ))
        .bind(query.weekday)
        .bind(bounds.map(|(start, _)| start))
        .bind(bounds.map(|(_, end)| end))
        .fetch_all(pool)
        .await?;
        Ok(menus)
    }

    /// Menus whose preparation date falls on the given local day, in schedule order.
    pub async fn list_for_day(pool: &PgPool, day: NaiveDate) -> anyhow::Result<Vec<Menu>> {
        let (start, end) = utc_day_bounds(day)?;
        let menus = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS}
             FROM menus
             WHERE preparation_date BETWEEN $1 AND $2
             ORDER BY preparation_date, created_at"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
        Ok(menus)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(menu)
    }

    pub async fn create(
        pool: &PgPool,
        fields: &MenuFields,
        added_by: Uuid,
    ) -> anyhow::Result<Menu> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "INSERT INTO menus (main_dish, side_dish, dessert, preparation_date, weekday, meal_time, added_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&fields.main_dish)
        .bind(&fields.side_dish)
        .bind(&fields.dessert)
        .bind(fields.preparation_date)
        .bind(fields.weekday)
        .bind(fields.meal_time)
        .bind(added_by)
        .fetch_one(pool)
        .await?;
        Ok(menu)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        fields: &MenuFields,
    ) -> anyhow::Result<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "UPDATE menus
             SET main_dish = $1,
                 side_dish = $2,
                 dessert = $3,
                 preparation_date = $4,
                 weekday = $5,
                 meal_time = $6,
                 updated_at = NOW()
             WHERE id = $7
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&fields.main_dish)
        .bind(&fields.side_dish)
        .bind(&fields.dessert)
        .bind(fields.preparation_date)
        .bind(fields.weekday)
        .bind(fields.meal_time)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(menu)
    }

    /// Returns `false` when no menu had that id.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
