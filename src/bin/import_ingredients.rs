use std::{env, path::PathBuf, process::ExitCode};

use clap::Parser;
use foodgram::{import_ingredients, parse_ingredient_csv};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "foodgram-import",
    about = "Loads ingredients from a CSV file of name,measurement_unit rows"
)]
struct ImportArgs {
    /// CSV file to import
    #[arg(default_value = "data/ingredients.csv")]
    path: PathBuf,

    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = ImportArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    if let Err(e) = dotenvy::dotenv() {
        info!("No .env file loaded: {e}");
    }

    let Some(database_url) = args
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok())
    else {
        error!("DATABASE_URL must be set (or pass --database-url)");
        return ExitCode::FAILURE;
    };

    let content = match tokio::fs::read_to_string(&args.path).await {
        Ok(content) => content,
        Err(e) => {
            error!("Could not read {}: {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let rows = match parse_ingredient_csv(&content) {
        Ok(rows) => rows,
        Err(e) => {
            error!("{}: {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Could not connect to the database: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!("Migrations failed: {e}");
        return ExitCode::FAILURE;
    }

    let cache = match env::var("REDIS_URL").ok().filter(|url| !url.is_empty()) {
        Some(url) => match redis::Client::open(url) {
            Ok(client) => client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| warn!("Could not connect to redis, cached searches may be stale: {e}"))
                .ok(),
            Err(e) => {
                warn!("Invalid REDIS_URL: {e}");
                None
            }
        },
        None => None,
    };

    match import_ingredients(&rows, &pool, cache).await {
        Ok(inserted) => {
            info!(
                "Imported {inserted} new ingredients ({} distinct rows read)",
                rows.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Import failed: {e}");
            ExitCode::FAILURE
        }
    }
}
