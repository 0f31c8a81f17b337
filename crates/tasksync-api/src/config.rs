use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_PATH: &str = "./data/tasks.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `:memory:` selects an in-memory store
    pub database_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = match (
            optional_trimmed(&lookup, "TASKSYNC_BIND_ADDR"),
            optional_trimmed(&lookup, "PORT"),
        ) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ConfigError::Invalid("PORT must be an integer in [1, 65535]".to_string())
                })?;
                if port == 0 {
                    return Err(ConfigError::Invalid(
                        "PORT must be an integer in [1, 65535]".to_string(),
                    ));
                }
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };
        let bind_addr = bind_addr.parse::<SocketAddr>().map_err(|_| {
            ConfigError::Invalid(format!(
                "TASKSYNC_BIND_ADDR must be a socket address like {DEFAULT_BIND_ADDR}"
            ))
        })?;

        let database_path = PathBuf::from(value_or_default(
            &lookup,
            "TASKSYNC_DATABASE_PATH",
            DEFAULT_DATABASE_PATH,
        ));

        Ok(Self {
            bind_addr,
            database_path,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
