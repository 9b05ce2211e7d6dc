use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Display names indexed by ISO weekday - 1 (Monday first).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miercoles",
    "Jueves",
    "Viernes",
    "Sabado",
    "Domingo",
];

/// Display name for an ISO weekday number (1 = Monday .. 7 = Sunday).
pub fn weekday_name(iso_weekday: u32) -> Option<&'static str> {
    let index = iso_weekday.checked_sub(1)? as usize;
    WEEKDAY_NAMES.get(index).copied()
}

/// Meal slot of a menu. Stored as SMALLINT (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealTime {
    Breakfast = 1,
    Lunch = 2,
    Dinner = 3,
    After = 4,
}

impl MealTime {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(MealTime::Breakfast),
            2 => Some(MealTime::Lunch),
            3 => Some(MealTime::Dinner),
            4 => Some(MealTime::After),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn label(self) -> &'static str {
        match self {
            MealTime::Breakfast => "Desayuno",
            MealTime::Lunch => "Comida",
            MealTime::Dinner => "Cena",
            MealTime::After => "After",
        }
    }

    /// 06–11 breakfast, 12–17 lunch, 18–23 dinner, 00–05 after.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => MealTime::Breakfast,
            12..=17 => MealTime::Lunch,
            18..=23 => MealTime::Dinner,
            _ => MealTime::After,
        }
    }
}

/// A menu offered for one meal on one day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub main_dish: String,
    pub side_dish: String,
    pub dessert: String,
    pub preparation_date: DateTime<Utc>,
    pub weekday: i16,
    pub meal_time: i16,
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    pub fn meal(&self) -> Option<MealTime> {
        MealTime::from_code(self.meal_time)
    }

    /// Human-readable dish list, e.g. "Pechuga de pavo, Pure de papa y Pastel".
    pub fn description(&self) -> String {
        format!("{}, {} y {}", self.main_dish, self.side_dish, self.dessert)
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidMenu {
    #[error("{0} cannot be empty")]
    EmptyDish(&'static str),
    #[error("weekday must be between 1 (Monday) and 7 (Sunday), got {0}")]
    Weekday(i16),
    #[error("meal_time must be between 1 and 4, got {0}")]
    MealTime(i16),
}

/// Body for POST /menus.
#[derive(Debug, Deserialize)]
pub struct CreateMenuRequest {
    pub main_dish: String,
    pub side_dish: String,
    pub dessert: String,
    /// Defaults to now.
    pub preparation_date: Option<DateTime<Utc>>,
    pub weekday: Option<i16>,
    pub meal_time: Option<i16>,
}

/// Body for PATCH /menus/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMenuRequest {
    pub main_dish: Option<String>,
    pub side_dish: Option<String>,
    pub dessert: Option<String>,
    pub preparation_date: Option<DateTime<Utc>>,
    pub weekday: Option<i16>,
    pub meal_time: Option<i16>,
}

/// Query params for GET /menus.
#[derive(Debug, Deserialize)]
pub struct MenuListQuery {
    pub weekday: Option<i16>,
    /// Only menus prepared on this local date (YYYY-MM-DD).
    pub date: Option<NaiveDate>,
}

/// Validated, normalised column values ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuFields {
    pub main_dish: String,
    pub side_dish: String,
    pub dessert: String,
    pub preparation_date: DateTime<Utc>,
    pub weekday: i16,
    pub meal_time: i16,
}

impl MenuFields {
    /// `prepared_local` is `preparation_date` on the server's wall clock; the
    /// derived weekday and meal time follow that clock.
    pub fn from_create(
        req: CreateMenuRequest,
        preparation_date: DateTime<Utc>,
        prepared_local: NaiveDateTime,
    ) -> Result<Self, InvalidMenu> {
        let (weekday, meal_time) = schedule_codes(prepared_local, req.weekday, req.meal_time)?;
        Ok(Self {
            main_dish: dish("main_dish", &req.main_dish)?,
            side_dish: dish("side_dish", &req.side_dish)?,
            dessert: dish("dessert", &req.dessert)?,
            preparation_date,
            weekday,
            meal_time,
        })
    }

    /// Applies a partial update on top of `current`. When the preparation date
    /// moves and no explicit codes are given, weekday and meal time are derived again.
    pub fn merge(
        current: &Menu,
        req: UpdateMenuRequest,
        prepared_local: NaiveDateTime,
    ) -> Result<Self, InvalidMenu> {
        let moved = req
            .preparation_date
            .is_some_and(|d| d != current.preparation_date);
        let (weekday, meal_time) = if moved {
            schedule_codes(prepared_local, req.weekday, req.meal_time)?
        } else {
            schedule_codes(
                prepared_local,
                Some(req.weekday.unwrap_or(current.weekday)),
                Some(req.meal_time.unwrap_or(current.meal_time)),
            )?
        };

        Ok(Self {
            main_dish: dish("main_dish", req.main_dish.as_deref().unwrap_or(&current.main_dish))?,
            side_dish: dish("side_dish", req.side_dish.as_deref().unwrap_or(&current.side_dish))?,
            dessert: dish("dessert", req.dessert.as_deref().unwrap_or(&current.dessert))?,
            preparation_date: req.preparation_date.unwrap_or(current.preparation_date),
            weekday,
            meal_time,
        })
    }
}

fn dish(field: &'static str, value: &str) -> Result<String, InvalidMenu> {
    let value = capitalize(value);
    if value.is_empty() {
        return Err(InvalidMenu::EmptyDish(field));
    }
    Ok(value)
}

/// Resolves weekday and meal-time codes, deriving missing ones from `prepared_local`.
pub fn schedule_codes(
    prepared_local: NaiveDateTime,
    weekday: Option<i16>,
    meal_time: Option<i16>,
) -> Result<(i16, i16), InvalidMenu> {
    let weekday = match weekday {
        Some(w) if (1..=7).contains(&w) => w,
        Some(w) => return Err(InvalidMenu::Weekday(w)),
        None => prepared_local.weekday().number_from_monday() as i16,
    };
    let meal_time = match meal_time {
        Some(code) => MealTime::from_code(code)
            .ok_or(InvalidMenu::MealTime(code))?
            .code(),
        None => MealTime::from_hour(prepared_local.hour()).code(),
    };
    Ok((weekday, meal_time))
}
