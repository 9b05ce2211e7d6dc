use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, selection::MenuSelection},
    services::date_window::utc_day_bounds,
};

const SELECTION_COLUMNS: &str =
    "s.id, s.menu_id, s.user_id, u.username, s.customizations, s.selected_at, s.updated_at";

pub struct SelectionService;

impl SelectionService {
    /// Selections visible to `viewer`: their own, or everyone's for staff.
    /// `order_clause` must come from `SelectionListQuery::order_clause`.
    pub async fn list(
        pool: &PgPool,
        viewer: &AuthenticatedUser,
        selected_on: Option<chrono::NaiveDate>,
        order_clause: &str,
    ) -> anyhow::Result<Vec<MenuSelection>> {
        let bounds: Option<(DateTime<Utc>, DateTime<Utc>)> =
            selected_on.map(utc_day_bounds).transpose()?;
        let owner = if viewer.is_staff { None } else { Some(viewer.user_id) };

        let selections = sqlx::query_as::<_, MenuSelection>(&format!(
            "SELECT {SELECTION_COLUMNS}
             FROM menu_selections s
             JOIN users u ON u.id = s.user_id
             WHERE ($1::UUID IS NULL OR s.user_id = $1)
               AND ($2::TIMESTAMPTZ IS NULL OR s.selected_at BETWEEN $2 AND $3)
             ORDER BY {order_clause}"
        ))
        .bind(owner)
        .bind(bounds.map(|(start, _)| start))
        .bind(bounds.map(|(_, end)| end))
        .fetch_all(pool)
        .await?;
        Ok(selections)
    }

    /// Fetch one selection if `viewer` may see it.
    pub async fn get(
        pool: &PgPool,
        viewer: &AuthenticatedUser,
        id: Uuid,
    ) -> anyhow::Result<Option<MenuSelection>> {
        let selection = sqlx::query_as::<_, MenuSelection>(&format!(
            "SELECT {SELECTION_COLUMNS}
             FROM menu_selections s
             JOIN users u ON u.id = s.user_id
             WHERE s.id = $1 AND ($2 OR s.user_id = $3)"
        ))
        .bind(id)
        .bind(viewer.is_staff)
        .bind(viewer.user_id)
        .fetch_optional(pool)
        .await?;
        Ok(selection)
    }

    /// Persist a selection. Callers must have checked eligibility first.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        menu_id: Uuid,
        customizations: &str,
    ) -> anyhow::Result<MenuSelection> {
        let selection = sqlx::query_as::<_, MenuSelection>(&format!(
            "WITH s AS (
                 INSERT INTO menu_selections (menu_id, user_id, customizations)
                 VALUES ($1, $2, $3)
                 RETURNING *
             )
             SELECT {SELECTION_COLUMNS}
             FROM s
             JOIN users u ON u.id = s.user_id"
        ))
        .bind(menu_id)
        .bind(user_id)
        .bind(customizations)
        .fetch_one(pool)
        .await?;
        Ok(selection)
    }

    /// Only the customizations change; `selected_at` stays as recorded.
    pub async fn update_customizations(
        pool: &PgPool,
        viewer: &AuthenticatedUser,
        id: Uuid,
        customizations: &str,
    ) -> anyhow::Result<Option<MenuSelection>> {
        let selection = sqlx::query_as::<_, MenuSelection>(&format!(
            "WITH s AS (
                 UPDATE menu_selections
                 SET customizations = $1, updated_at = NOW()
                 WHERE id = $2 AND ($3 OR user_id = $4)
                 RETURNING *
             )
             SELECT {SELECTION_COLUMNS}
             FROM s
             JOIN users u ON u.id = s.user_id"
        ))
        .bind(customizations)
        .bind(id)
        .bind(viewer.is_staff)
        .bind(viewer.user_id)
        .fetch_optional(pool)
        .await?;
        Ok(selection)
    }

    pub async fn delete(
        pool: &PgPool,
        viewer: &AuthenticatedUser,
        id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "DELETE FROM menu_selections WHERE id = $1 AND ($2 OR user_id = $3)",
        )
        .bind(id)
        .bind(viewer.is_staff)
        .bind(viewer.user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
