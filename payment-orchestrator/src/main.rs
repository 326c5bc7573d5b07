use std::sync::Arc;
use std::time::Duration;

use payment_orchestrator::api::{create_router, AppState};
use payment_orchestrator::config::Settings;
use payment_orchestrator::events::{EventPublisher, ProducerConfig};
use payment_orchestrator::idempotency::{
    HybridIdempotencyStore, IdempotencyHandler, IdempotencyHandlerConfig, PostgresIdempotencyStore,
    RedisIdempotencyCache,
};
use payment_orchestrator::ledger_client::HttpLedgerClient;
use payment_orchestrator::observability::{init_logging, init_metrics, HealthChecker, LogConfig, LogFormat};
use payment_orchestrator::repositories::{PaymentRepository, TransactionRepository};
use payment_orchestrator::txrecord_client::InProcessTransactionRecordClient;
use payment_orchestrator::PaymentOrchestrator;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};

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
    let redis_cache = if settings.redis.enabled {
        let mut conn = redis_client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        info!("redis connection established");
        Some(RedisIdempotencyCache::new(
            redis_client.clone(),
            settings.idempotency.key_prefix.clone(),
        ))
    } else {
        info!("redis idempotency cache disabled by configuration");
        None
    };

    // A Kafka outage at startup degrades rather than blocks: the saga's
    // durable writes never depend on the event bus being reachable (§4.5).
    let brokers: Vec<String> = settings
        .kafka
        .brokers
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();
    let mut publisher = EventPublisher::new(ProducerConfig {
        brokers,
        retry_count: settings.events.producer_retries,
        retry_delay_ms: settings.events.producer_retry_delay_ms,
        ..Default::default()
    });
    match tokio::time::timeout(
        Duration::from_secs(settings.kafka.connect_timeout_secs),
        publisher.connect(),
    )
    .await
    {
        Ok(Ok(())) => info!("kafka connection established"),
        Ok(Err(err)) => warn!(%err, "failed to connect to kafka; events will not be published"),
        Err(_) => warn!("kafka connection timed out; events will not be published"),
    }
    let kafka_connected = publisher.is_connected();
    let events = Arc::new(publisher);

    let ledger: Arc<dyn ledger_core::LedgerClient> = Arc::new(HttpLedgerClient::new(
        settings.ledger.endpoint.clone(),
        Duration::from_secs(settings.ledger.timeout_secs),
    ));

    let transaction_repository = TransactionRepository::new(pool.clone());
    let txrecord: Arc<dyn ledger_core::TransactionRecordClient> = Arc::new(
        InProcessTransactionRecordClient::new(transaction_repository, events.clone()),
    );

    let payment_repository = PaymentRepository::new(pool.clone());
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        payment_repository,
        ledger,
        txrecord,
        events,
    ));

    let idempotency_store = HybridIdempotencyStore::new(
        PostgresIdempotencyStore::new(pool.clone()),
        redis_cache,
        settings.idempotency.ttl_seconds,
    );
    let idempotency = Arc::new(IdempotencyHandler::new(
        idempotency_store,
        IdempotencyHandlerConfig {
            ttl_seconds: settings.idempotency.ttl_seconds,
            key_prefix: settings.idempotency.key_prefix.clone(),
        },
    ));

    let health_checker = Arc::new(HealthChecker::new(pool, redis_client, kafka_connected));

    let state = AppState::new(orchestrator, idempotency, health_checker).with_metrics(metrics_handle);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", settings.http.port);
    info!("starting orchestrator-server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
