use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use food_lens::api::{self, AppState};
use food_lens::commands::CommandHandler;
use food_lens::config::AppConfig;
use food_lens::database::MealStore;
use food_lens::food::analysis::FoodAnalyzer;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the HTTP API instead of the interactive shell
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,

    /// Meal log database, overrides MEAL_DB_PATH
    #[arg(long)]
    db: Option<PathBuf>,

    /// Analyze one image and exit
    #[arg(long, value_name = "PATH")]
    analyze: Option<PathBuf>,
}

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    colored::control::set_override(true);
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }

    let analyzer = Arc::new(FoodAnalyzer::from_config(
        &config.food,
        config.engine(),
        config.nutrition_cache_size,
    )?);

    if let Some(path) = &args.analyze {
        let bytes = tokio::fs::read(path).await?;
        let image = food_lens::providers::utils::ImageInput::from_bytes(bytes)?;
        let report = analyzer.analyze(&image).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let meals = MealStore::open(&config.db_path).await?;
    info!("Meal log at {}", config.db_path.display());

    if args.api {
        run_api_server(&args, &config, analyzer, meals).await
    } else {
        run_cli_mode(analyzer, meals).await
    }
}

async fn run_cli_mode(analyzer: Arc<FoodAnalyzer>, meals: MealStore) -> AppResult<()> {
    if analyzer.pipeline().provider_count() == 0 {
        println!(
            "{}",
            "No recognition providers configured. Set CLARIFAI_PAT, GEMINI_API_KEY or GOOGLE_VISION_API_KEY.".yellow()
        );
    }

    let mut command_handler = CommandHandler::new(analyzer, meals);
    command_handler.handle_command("help").await?;

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("🍽️  ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(
    args: &Args,
    config: &AppConfig,
    analyzer: Arc<FoodAnalyzer>,
    meals: MealStore,
) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let app = api::create_api(
        AppState::new(analyzer, meals),
        config.max_concurrent_requests,
    );

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    println!("Server successfully bound to {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
