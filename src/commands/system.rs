use colored::Colorize;

pub fn handle_command(input: &str) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n{}", "🍽️  Food Commands:".bold());
            println!("  analyze <image>            - Recognize the food in a photo");
            println!("  nutrition <food>           - Look up nutrition facts");
            println!("  Example: analyze lunch.jpg, nutrition greek yogurt");
            println!();

            println!("{}", "📒 Meal Log Commands:".bold());
            println!("  log <user> <date> <meal> <food, food, ...>");
            println!("                             - Log a meal (meal: breakfast, lunch, dinner, snack)");
            println!("  meals <user> <date>        - Show meals and totals for a day");
            println!("  Example: log alice 2024-03-05 lunch chicken salad, apple");
            println!();

            println!("{}", "⚙️ System Commands:".bold());
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program");
            println!();
            Ok(())
        }
        "exit" | "quit" => {
            println!("👋 Goodbye!");
            std::process::exit(0);
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
