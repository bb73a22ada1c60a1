use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SESSION_SECRET: &str = "supersecret_dev_key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Which history backend the chat route is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// History lives in server memory behind a signed session cookie
    Session,
    /// History is keyed by `user_id` and persisted to a JSON file
    Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub index_path: PathBuf,
    pub mode: RelayMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub lifetime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LLMConfig {
                model: "meta-llama/Llama-3.3-70b-instruct".to_string(),
                base_url: "https://openrouter.ai/api/v1".to_string(),
                max_tokens: 400,
                temperature: 0.7,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                index_path: PathBuf::from("index.html"),
                mode: RelayMode::Session,
            },
            session: SessionConfig {
                secret: DEFAULT_SESSION_SECRET.to_string(),
                cookie_name: "osbuddy_session".to_string(),
                lifetime_secs: 2 * 60 * 60,
            },
            store: StoreConfig {
                path: PathBuf::from("chat_history.json"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Layers built-in defaults, `config/{CONFIG_ENV}`, `APP__*` variables and
    /// the deployment variables `PORT` and `SESSION_SECRET_KEY`, in that order.
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("session.secret", env::var("SESSION_SECRET_KEY").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Upstream key. Absence is not fatal: requests will fail at the provider instead.
    pub fn api_key() -> Option<String> {
        env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.session.secret == DEFAULT_SESSION_SECRET
    }
}
