//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint, used when a Gemini key is configured.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub ai_api_key: String,
    /// `None` means the client library's default (api.openai.com).
    pub ai_api_base: Option<String>,
    pub estimate_model: String,
    pub layout_model: String,
    pub ai_timeout: Duration,
    pub layout_style_count: usize,
    pub cors_origin: String,
    /// Password given to the demo accounts when they are installed into an empty database.
    pub seed_password: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load the Generative Service Settings ---
        // A Gemini key wins over an OpenAI key and implies Gemini's endpoint.
        let (ai_api_key, default_base) = match (lookup("GEMINI_API_KEY"), lookup("OPENAI_API_KEY")) {
            (Some(key), _) => (key, Some(GEMINI_OPENAI_BASE.to_string())),
            (None, Some(key)) => (key, None),
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "GEMINI_API_KEY or OPENAI_API_KEY".to_string(),
                ))
            }
        };
        let ai_api_base = lookup("AI_API_BASE").or(default_base);

        let estimate_model = lookup("ESTIMATE_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string());
        let layout_model =
            lookup("LAYOUT_MODEL").unwrap_or_else(|| "imagen-3.0-generate-002".to_string());

        let ai_timeout = match lookup("AI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ConfigError::InvalidValue("AI_TIMEOUT_SECS".to_string(), raw.clone())
                })?,
            None => Duration::from_secs(60),
        };

        let layout_style_count = match lookup("LAYOUT_STYLE_COUNT") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=3).contains(n))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "LAYOUT_STYLE_COUNT".to_string(),
                        format!("'{}' is not between 1 and 3", raw),
                    )
                })?,
            None => 3,
        };

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let seed_password = lookup("SEED_PASSWORD").unwrap_or_else(|| "password123".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            ai_api_key,
            ai_api_base,
            estimate_model,
            layout_model,
            ai_timeout,
            layout_style_count,
            cors_origin,
            seed_password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_gemini_key() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/buildestimate"), ("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.ai_api_base.as_deref(), Some(GEMINI_OPENAI_BASE));
        assert_eq!(config.ai_timeout, Duration::from_secs(60));
        assert_eq!(config.layout_style_count, 3);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.seed_password, "password123");
    }

    #[test]
    fn openai_key_uses_library_default_base() {
        let config = load(&[("DATABASE_URL", "postgres://x"), ("OPENAI_API_KEY", "sk")]).unwrap();
        assert_eq!(config.ai_api_base, None);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = load(&[("GEMINI_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn missing_ai_key_is_reported() {
        assert!(matches!(load(&[("DATABASE_URL", "postgres://x")]), Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [("DATABASE_URL", "postgres://x"), ("GEMINI_API_KEY", "k")];
        for (key, value) in [
            ("BIND_ADDRESS", "nope"),
            ("RUST_LOG", "loud"),
            ("AI_TIMEOUT_SECS", "0"),
            ("LAYOUT_STYLE_COUNT", "4"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            assert!(
                matches!(load(&pairs), Err(ConfigError::InvalidValue(ref k, _)) if k == key),
                "{} = {}",
                key,
                value
            );
        }
    }
}
