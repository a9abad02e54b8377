use chrono::NaiveDate;
use colored::Colorize;

use super::food::nutrient_lines;
use crate::database::MealStore;
use crate::food::analysis::FoodAnalyzer;
use crate::food::meal::{LoggedFood, MealLogRequest, DATE_FORMAT};

const LOG_USAGE: &str = "Usage: log <user> <date> <meal> <food, food, ...>";
const MEALS_USAGE: &str = "Usage: meals <user> <date>";

pub async fn log(analyzer: &FoodAnalyzer, store: &MealStore, args: &str) -> Result<(), String> {
    let mut request = parse_log_args(args)?;

    // Fill in nutrients for foods the database knows.
    for food in &mut request.foods {
        if let Some(record) = analyzer.nutrition().find(&food.name).await {
            food.nutrients = record.nutrients;
        }
    }

    let meal = request.into_new_meal().map_err(|e| e.to_string())?;
    let record = store.log_meal(meal).await.map_err(|e| e.to_string())?;
    println!(
        "✅ Logged {} for {} on {} ({})",
        record.meal_type.to_string().green(),
        record.user_id.cyan(),
        record.date,
        record.id
    );
    Ok(())
}

pub async fn list(store: &MealStore, args: &str) -> Result<(), String> {
    let (user_id, date) = match args.split_whitespace().collect::<Vec<_>>()[..] {
        [user_id, date] => (user_id, date),
        _ => return Err(MEALS_USAGE.to_string()),
    };
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;

    let meals = store
        .meals_for_date(user_id, date)
        .await
        .map_err(|e| e.to_string())?;
    if meals.is_empty() {
        println!("No meals logged for {} on {}", user_id.cyan(), date);
        return Ok(());
    }

    for meal in &meals {
        let foods = meal
            .foods
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{} {}: {}", "•".cyan(), meal.meal_type.to_string().bold(), foods);
    }

    let totals = store
        .daily_totals(user_id, date)
        .await
        .map_err(|e| e.to_string())?;
    println!("\n📊 Totals for {} meals:", totals.meal_count);
    for line in nutrient_lines(&totals.nutrients) {
        println!("  {}", line);
    }
    Ok(())
}

fn parse_log_args(args: &str) -> Result<MealLogRequest, String> {
    let mut parts = args.splitn(4, char::is_whitespace).map(str::trim);
    let (Some(user_id), Some(date), Some(meal_type), Some(foods)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(LOG_USAGE.to_string());
    };

    let foods: Vec<LoggedFood> = foods
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(LoggedFood::named)
        .collect();

    Ok(MealLogRequest {
        user_id: user_id.to_string(),
        date: date.to_string(),
        meal_type: meal_type.to_string(),
        foods,
    })
}
