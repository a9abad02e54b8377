use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::food::analysis::Nutrients;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, PartialEq)]
pub enum MealLogError {
    #[error("Invalid meal type '{0}', expected one of Breakfast, Lunch, Dinner, Snack")]
    InvalidMealType(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Every food needs a name")]
    UnnamedFood,
    #[error("Invalid meal log request: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = MealLogError;

    /// Case-insensitive: "dinner" and "DINNER" are capitalized to "Dinner" first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match capitalize(s.trim()).as_str() {
            "Breakfast" => Ok(MealType::Breakfast),
            "Lunch" => Ok(MealType::Lunch),
            "Dinner" => Ok(MealType::Dinner),
            "Snack" => Ok(MealType::Snack),
            _ => Err(MealLogError::InvalidMealType(s.to_string())),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// One food in a logged meal, with whatever nutrients the client knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedFood {
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

impl LoggedFood {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nutrients: Nutrients::default(),
        }
    }
}

/// Meal log payload as received from clients.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MealLogRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    pub date: String,
    pub meal_type: String,
    #[validate(length(min = 1, max = 50))]
    pub foods: Vec<LoggedFood>,
}

impl MealLogRequest {
    pub fn into_new_meal(self) -> Result<NewMeal, MealLogError> {
        self.validate()
            .map_err(|e| MealLogError::Validation(e.to_string()))?;

        let meal_type = self.meal_type.parse()?;
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| MealLogError::InvalidDate(self.date.clone()))?;
        if self.foods.iter().any(|f| f.name.trim().is_empty()) {
            return Err(MealLogError::UnnamedFood);
        }

        Ok(NewMeal {
            user_id: self.user_id.trim().to_string(),
            date,
            meal_type,
            foods: self.foods,
        })
    }
}

/// A validated meal, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub foods: Vec<LoggedFood>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub foods: Vec<LoggedFood>,
    pub created_at: DateTime<Utc>,
}

impl MealRecord {
    pub fn total_nutrients(&self) -> Nutrients {
        self.foods
            .iter()
            .fold(Nutrients::default(), |acc, food| acc.add(&food.nutrients))
    }
}

/// Nutrient totals across all meals a user logged on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_count: usize,
    pub nutrients: Nutrients,
}

impl DailyTotals {
    pub fn from_meals(user_id: &str, date: NaiveDate, meals: &[MealRecord]) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            meal_count: meals.len(),
            nutrients: meals
                .iter()
                .fold(Nutrients::default(), |acc, meal| acc.add(&meal.total_nutrients())),
        }
    }
}
