use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::food::meal::{DailyTotals, LoggedFood, MealRecord, MealType, NewMeal, DATE_FORMAT};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Corrupt meal record {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("Failed to encode foods: {0}")]
    Encode(#[from] serde_json::Error),
}

type MealRow = (String, String, String, String, String, String);

/// Per-user, per-date meal log on SQLite.
#[derive(Clone)]
pub struct MealStore {
    conn: Arc<Connection>,
}

impl MealStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let store = Self {
            conn: Arc::new(conn),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS meals (
                        id TEXT PRIMARY KEY,
                        user_id TEXT NOT NULL,
                        date TEXT NOT NULL,
                        meal_type TEXT NOT NULL,
                        foods TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_meals_user_date ON meals (user_id, date);",
                )?;
                Ok(())
            })
            .await?;

        info!("Meal log initialized");
        Ok(())
    }

    /// Stores a validated meal and returns it with its assigned id and timestamp.
    pub async fn log_meal(&self, meal: NewMeal) -> Result<MealRecord, DatabaseError> {
        let record = MealRecord {
            id: Uuid::new_v4(),
            user_id: meal.user_id,
            date: meal.date,
            meal_type: meal.meal_type,
            foods: meal.foods,
            // Stored with microsecond precision.
            created_at: Utc::now().trunc_subsecs(6),
        };

        let id = record.id.to_string();
        let user_id = record.user_id.clone();
        let date = record.date.format(DATE_FORMAT).to_string();
        let meal_type = record.meal_type.to_string();
        let foods = serde_json::to_string(&record.foods)?;
        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO meals (id, user_id, date, meal_type, foods, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    [&id, &user_id, &date, &meal_type, &foods, &created_at],
                )?;
                Ok(())
            })
            .await?;

        info!(
            "Logged {} for {} on {} ({} foods)",
            record.meal_type,
            record.user_id,
            record.date,
            record.foods.len()
        );
        Ok(record)
    }

    /// Meals for one user and day, oldest first.
    pub async fn meals_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<MealRecord>, DatabaseError> {
        let user_id = user_id.to_string();
        let date = date.format(DATE_FORMAT).to_string();

        let rows: Vec<MealRow> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, date, meal_type, foods, created_at
                     FROM meals
                     WHERE user_id = ?1 AND date = ?2
                     ORDER BY created_at ASC, id ASC",
                )?;

                let rows = stmt.query_map([&user_id, &date], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?;

                let mut meals = Vec::new();
                for row in rows {
                    meals.push(row?);
                }
                Ok(meals)
            })
            .await?;

        debug!("Loaded {} meal rows", rows.len());
        rows.into_iter().map(decode_row).collect()
    }

    /// Deletes a meal owned by `user_id`. Returns false if there was no such meal.
    pub async fn delete_meal(&self, user_id: &str, meal_id: Uuid) -> Result<bool, DatabaseError> {
        let user_id = user_id.to_string();
        let meal_id = meal_id.to_string();

        let deleted = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "DELETE FROM meals WHERE id = ?1 AND user_id = ?2",
                    [&meal_id, &user_id],
                )?;
                Ok(count)
            })
            .await?;

        Ok(deleted > 0)
    }

    pub async fn daily_totals(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<DailyTotals, DatabaseError> {
        let meals = self.meals_for_date(user_id, date).await?;
        Ok(DailyTotals::from_meals(user_id, date, &meals))
    }
}

fn decode_row(row: MealRow) -> Result<MealRecord, DatabaseError> {
    let (id, user_id, date, meal_type, foods, created_at) = row;
    let corrupt = |reason: String| DatabaseError::Corrupt {
        id: id.clone(),
        reason,
    };

    let uuid = Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| corrupt(e.to_string()))?;
    let meal_type = meal_type
        .parse::<MealType>()
        .map_err(|e| corrupt(e.to_string()))?;
    let foods: Vec<LoggedFood> = serde_json::from_str(&foods).map_err(|e| corrupt(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| corrupt(e.to_string()))?
        .with_timezone(&Utc);

    Ok(MealRecord {
        id: uuid,
        user_id,
        date,
        meal_type,
        foods,
        created_at,
    })
}
