use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's pick of one menu. `selected_at` never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuSelection {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub customizations: String,
    pub selected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for POST /menu-selections.
#[derive(Debug, Deserialize)]
pub struct CreateSelectionRequest {
    pub menu: Uuid,
    #[serde(default)]
    pub customizations: String,
}

/// Body for PATCH /menu-selections/{id}.
#[derive(Debug, Deserialize)]
pub struct UpdateSelectionRequest {
    pub customizations: String,
}

/// Query params for GET /menu-selections.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionListQuery {
    /// Only selections made on this local date (YYYY-MM-DD).
    pub selected_at: Option<NaiveDate>,
    pub order_by: Option<String>,
    pub sort: Option<String>,
}

impl SelectionListQuery {
    /// SQL `ORDER BY` clause for the requested ordering. Only whitelisted
    /// columns are accepted since the clause is spliced into the query.
    pub fn order_clause(&self) -> Result<String, String> {
        let column = match self.order_by.as_deref().unwrap_or("selected_at") {
            "selected_at" => "s.selected_at",
            "updated_at" => "s.updated_at",
            other => return Err(format!("cannot order selections by '{other}'")),
        };
        let direction = if self.sort.as_deref() == Some("desc") { "DESC" } else { "ASC" };
        Ok(format!("{column} {direction}"))
    }
}
