use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub midtrans: MidtransConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Root directory for the public content store. QR artifacts land under
/// `<root>/qr/guests/` and the whole tree is served at `/storage`.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "storage/public".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MidtransConfig {
    pub server_key: Option<String>,
    pub client_key: Option<String>,
    #[serde(default)]
    pub is_production: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_minimum_gift_amount")]
    pub minimum_gift_amount: i64,
}

fn default_minimum_gift_amount() -> i64 {
    1000
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("storage.root", "storage/public")?
            .set_default("midtrans.enabled", false)?
            .set_default("midtrans.is_production", false)?
            .set_default("midtrans.minimum_gift_amount", 1000)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with UNDANGAN__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("UNDANGAN").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://undangan.db".to_string(),
                max_connections: 10,
            },
            storage: StorageConfig::default(),
            midtrans: MidtransConfig {
                server_key: None,
                client_key: None,
                is_production: false,
                enabled: false,
                minimum_gift_amount: 1000,
            },
        }
    }
}
