//! Application settings.
//!
//! Read from the optional `config/relief_desk.toml`, then overridden by
//! `RELIEF_DESK__<SECTION>__<KEY>` environment variables, e.g.
//! `RELIEF_DESK__SERVER__JWT_SECRET`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Database,
    pub jwt_secret: String,
    pub max_body_bytes: Option<usize>,
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/relief_desk").required(false))
            .add_source(Environment::with_prefix("RELIEF_DESK").separator("__"))
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        if settings.server.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "server.jwt_secret must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }
}
