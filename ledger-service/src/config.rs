use serde::Deserialize;

/// Layered configuration for `ledger-server`, following the teacher's
/// `config` crate layering: `config/default.toml` -> `config/local.toml`
/// (optional) -> `LEDGER__*` environment variables (§6.4).
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: CacheSettings,
    pub reservation: ReservationSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_conns: u32,
}

/// `ledger.redis.*` — the optional balance-read cache (§2 ambient
/// additions). `enabled=false` degrades every lookup to a plain database
/// read; the ledger's correctness never depends on this cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub url: String,
    pub enabled: bool,
    pub balance_ttl_secs: i64,
    pub key_prefix: String,
}

/// `ledger.reservation.*` (§6.4).
#[derive(Debug, Deserialize)]
pub struct ReservationSettings {
    pub default_ttl_secs: i64,
}

impl ReservationSettings {
    pub fn default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.default_ttl_secs)
    }
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
            .set_default("reservation.default_ttl_secs", 900)?
            .set_default("redis.enabled", true)?
            .set_default("redis.balance_ttl_secs", 5)?
            .set_default("redis.key_prefix", "ledger")?
            .set_default("http.log_format", "pretty")?
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LEDGER").separator("__"));

        builder.build()?.try_deserialize()
    }
}
