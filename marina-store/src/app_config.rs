use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 { 5 }
fn default_true() -> bool { true }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
}

fn default_admin_role() -> String { "admin".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root_dir: String,
    pub public_base_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize { 5 * 1024 * 1024 }

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_true")]
    pub block_dates_on_confirm: bool,
    /// Booking submissions allowed per client IP per window
    #[serde(default = "default_intake_rate_limit")]
    pub intake_rate_limit: i64,
    #[serde(default = "default_intake_rate_window")]
    pub intake_rate_window_seconds: i64,
}

fn default_intake_rate_limit() -> i64 { 5 }
fn default_intake_rate_window() -> i64 { 3600 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            block_dates_on_confirm: true,
            intake_rate_limit: default_intake_rate_limit(),
            intake_rate_window_seconds: default_intake_rate_window(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `MARINA__AUTH__JWT_SECRET=...`
            .add_source(config::Environment::with_prefix("MARINA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let raw = r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/marina"

            [auth]
            jwt_secret = "secret"

            [storage]
            root_dir = "media"
            public_base_url = "http://localhost:8080/media"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert!(config.redis.is_none());
        assert_eq!(config.auth.admin_role, "admin");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.business_rules.block_dates_on_confirm);
        assert_eq!(config.storage.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_memory_backend_selectable() {
        let raw = r#"
            [server]
            port = 3000
            [database]
            url = ""
            [store]
            backend = "memory"
            [auth]
            jwt_secret = "s"
            [storage]
            root_dir = "/tmp/m"
            public_base_url = "http://x/media"
            [business_rules]
            block_dates_on_confirm = false
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.business_rules.block_dates_on_confirm);
        assert_eq!(config.business_rules.intake_rate_limit, 5);
    }
}
