use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use foodgram::{
    api::{routes, ApiContext},
    config::Config,
};
use redis::aio::MultiplexedConnection;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn connect_cache(url: &str) -> Option<MultiplexedConnection> {
    let client = redis::Client::open(url)
        .map_err(|e| warn!("Invalid REDIS_URL, caching disabled: {e}"))
        .ok()?;

    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| warn!("Could not connect to redis, caching disabled: {e}"))
        .ok()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
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

    let cache = match &config.redis_url {
        Some(url) => connect_cache(url).await,
        None => {
            info!("REDIS_URL not set, caching disabled");
            None
        }
    };

    let context = ApiContext {
        pool,
        cache,
        secret: Arc::from(config.jwt_secret.as_str()),
        session_hours: config.session_hours,
    };

    let address = SocketAddr::new(config.host, config.port);
    let bound = warp::serve(routes(context)).try_bind_with_graceful_shutdown(address, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
        }
    });
    let (address, server) = match bound {
        Ok(bound) => bound,
        Err(e) => {
            error!("Could not bind {address}: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Listening on http://{address}");
    server.await;
    info!("Shut down");

    ExitCode::SUCCESS
}
