use std::sync::Arc;

use crate::database::MealStore;
use crate::food::analysis::FoodAnalyzer;

mod food;
mod meals;
mod system;

pub struct CommandHandler {
    analyzer: Arc<FoodAnalyzer>,
    meals: MealStore,
}

impl CommandHandler {
    pub fn new(analyzer: Arc<FoodAnalyzer>, meals: MealStore) -> Self {
        Self { analyzer, meals }
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "help" | "exit" | "quit" => system::handle_command(command),
            "analyze" => food::analyze(&self.analyzer, args).await,
            "nutrition" => food::nutrition(&self.analyzer, args).await,
            "log" => meals::log(&self.analyzer, &self.meals, args).await,
            "meals" => meals::list(&self.meals, args).await,
            _ => Err(format!(
                "Unknown command '{}'. Type 'help' for available commands.",
                command
            )),
        }
    }
}
