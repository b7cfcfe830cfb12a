use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::assistant::DEFAULT_SYSTEM_PROMPT;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// Expected `iss` claim; unchecked when unset.
    pub jwt_issuer: Option<String>,
    pub api_prefix: String,
    pub app_env: String,

    pub log_dir: String,
    pub log_level: String,

    pub db_max_connections: u32,
    pub store_timeout: Duration,

    // Rate limiting, requests per minute per peer. 0 disables.
    pub rate_protected_per_min: u32,
    pub rate_assistant_per_min: u32,

    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub assistant_timeout: Duration,
    pub assistant_cache_ttl: Duration,
    pub assistant_system_prompt: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = |key: &str| var(key).with_context(|| format!("{key} must be set"));

        fn parsed<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match value {
                None => Ok(default),
                Some(raw) => raw
                    .parse()
                    .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}")),
            }
        }

        let api_prefix = var("API_PREFIX").unwrap_or_else(|| "/api".to_string());
        if !api_prefix.starts_with('/') {
            bail!("API_PREFIX must start with '/'");
        }

        let store_timeout_secs: u64 = parsed(var("STORE_TIMEOUT_SECS"), "STORE_TIMEOUT_SECS", 5)?;
        if store_timeout_secs == 0 {
            bail!("STORE_TIMEOUT_SECS must be greater than 0");
        }

        let db_max_connections: u32 = parsed(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?;
        if db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be greater than 0");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: var("JWT_ISSUER"),
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            app_env: var("APP_ENV").unwrap_or_else(|| "production".to_string()),

            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            db_max_connections,
            store_timeout: Duration::from_secs(store_timeout_secs),

            rate_protected_per_min: parsed(
                var("RATE_PROTECTED_PER_MIN"),
                "RATE_PROTECTED_PER_MIN",
                1000,
            )?,
            rate_assistant_per_min: parsed(
                var("RATE_ASSISTANT_PER_MIN"),
                "RATE_ASSISTANT_PER_MIN",
                20,
            )?,

            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            gemini_base_url: var("GEMINI_BASE_URL"),
            assistant_timeout: Duration::from_secs(parsed(
                var("ASSISTANT_TIMEOUT_SECS"),
                "ASSISTANT_TIMEOUT_SECS",
                30,
            )?),
            assistant_cache_ttl: Duration::from_secs(parsed(
                var("ASSISTANT_CACHE_TTL_SECS"),
                "ASSISTANT_CACHE_TTL_SECS",
                600,
            )?),
            assistant_system_prompt: var("ASSISTANT_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://root@localhost/hr"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.rate_assistant_per_min, 20);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert!(config.gemini_api_key.is_none());
        assert!(!config.is_development());
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "many"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_prefix() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("API_PREFIX", "/v1/"));
        pairs.push(("APP_ENV", "Development"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.api_prefix, "/v1");
        assert!(config.is_development());
    }
}
