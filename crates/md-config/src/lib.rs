//! # md-config
//!
//! Typed runtime settings. Sources, later ones winning:
//! built-in defaults, `config/default.toml`, `config/{MEDIDRONE_ENV}.toml`,
//! `.env`, then `MEDIDRONE__SECTION__KEY` environment variables.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "MEDIDRONE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("failed to read .env: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// May carry credentials, so it is never printed.
    pub url: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory uploaded images are written to.
    pub root: PathBuf,
    /// URL path the directory is served under. Starts with `/`, never ends with one.
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Settings {
    /// Loads settings from the working directory and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        env_file(dotenvy::dotenv())?;
        let env = std::env::var(format!("{ENV_PREFIX}_ENV")).unwrap_or_else(|_| "development".into());
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{env}")).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let mut settings = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:medidrone.db")?
            .set_default("media.root", "./data/media")?
            .set_default("media.url_prefix", "/media")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?
            .build()?
            .try_deserialize::<Settings>()?;

        let prefix = settings.media.url_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "media.url_prefix",
                reason: "must be an absolute path other than /",
            });
        }
        settings.media.url_prefix = prefix.to_string();
        Ok(settings)
    }
}

/// A missing .env is normal outside development; an unreadable one is not.
fn env_file<T>(loaded: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

impl ServerSettings {
    /// `host:port`, resolved by the listener so host names work too.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
