use ledger_service::api::{create_router, AppState};
use ledger_service::cache::BalanceCache;
use ledger_service::config::Settings;
use ledger_service::observability::{init_logging, init_metrics, HealthChecker, LogConfig, LogFormat};
use ledger_service::LedgerEngine;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::new()?;

    let log_config = LogConfig {
        level: settings.http.log_level.clone(),
        format: LogFormat::from(settings.http.log_format.as_str()),
        include_target: true,
        include_file: false,
        include_line: false,
    };
    init_logging(&log_config);

    let metrics_handle = init_metrics();
    info!("configuration loaded, metrics initialized");

    info!("connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_conns)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("database connection established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");

    info!("connecting to redis...");
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let cache = if settings.redis.enabled {
        let mut conn = redis_client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        info!("redis connection established");
        Some(BalanceCache::new(redis_client.clone(), settings.redis.clone()))
    } else {
        info!("redis cache disabled by configuration");
        None
    };

    let health_checker = Arc::new(HealthChecker::new(pool.clone(), redis_client.clone()));
    let engine = Arc::new(LedgerEngine::new(pool, cache, settings.reservation.default_ttl()));

    let state = AppState::new(engine, health_checker).with_metrics(metrics_handle);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", settings.http.port);
    info!("starting ledger-server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
