//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Base URL of the OpenAI-compatible text-generation gateway
    pub ai_gateway_url: String,

    /// API key for the gateway; AI endpoints fail with a generic error when unset
    pub ai_gateway_key: Option<String>,

    /// Model name passed to the gateway
    pub ai_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let ai_gateway_url = env::var("AI_GATEWAY_URL")
            .unwrap_or_else(|_| "https://api.runable.com/gateway/v1".to_string());

        let ai_gateway_key = env::var("AI_GATEWAY_KEY").ok();

        let ai_model = env::var("AI_MODEL").unwrap_or_else(|_| "gpt-5-mini".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            ai_gateway_url,
            ai_gateway_key,
            ai_model,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
