use serde::Deserialize;

/// Layered configuration for `orchestrator-server`, mirroring
/// `ledger-service::config::Settings` (§6.4): `config/default.toml` ->
/// `config/local.toml` (optional) -> `ORCHESTRATOR__*` environment
/// variables.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub kafka: KafkaSettings,
    pub events: EventSettings,
    pub ledger: LedgerClientSettings,
    pub txrecord: TxRecordClientSettings,
    pub idempotency: IdempotencySettings,
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct KafkaSettings {
    pub brokers: String,
    pub connect_timeout_secs: u64,
}

/// `events.producer.*` (§6.4). Topic names themselves are the fixed
/// two-topic layout from §6.3 (`TransactionEventPayload::topic()`,
/// `PaymentEventPayload::topic()`), not configurable here.
#[derive(Debug, Deserialize)]
pub struct EventSettings {
    pub producer_retries: u32,
    pub producer_retry_delay_ms: u64,
}

/// `orchestrator.ledger_endpoint` (§6.4) — the base URL `HttpLedgerClient`
/// dispatches against.
#[derive(Debug, Deserialize)]
pub struct LedgerClientSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// `orchestrator.txrecord_endpoint` (§6.4) — kept as its own config key
/// even though the Transaction Record Store runs in-process here, so a
/// future split into its own service is a wiring change, not a code change
/// (SPEC_FULL §7).
#[derive(Debug, Deserialize)]
pub struct TxRecordClientSettings {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct IdempotencySettings {
    pub ttl_seconds: i64,
    pub key_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("redis.enabled", true)?
            .set_default("kafka.connect_timeout_secs", 3)?
            .set_default("events.producer_retries", 3)?
            .set_default("events.producer_retry_delay_ms", 100)?
            .set_default("ledger.timeout_secs", 10)?
            .set_default("txrecord.endpoint", "in-process")?
            .set_default("idempotency.ttl_seconds", 86400)?
            .set_default("idempotency.key_prefix", "idem")?
            .set_default("http.log_format", "pretty")?
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("ORCHESTRATOR").separator("__"));

        builder.build()?.try_deserialize()
    }
}
