//! Configuration for the Ward server.
//!
//! Settings are layered: `config/default.toml`, then an optional
//! `config/{RUN_MODE}.toml`, then `WARD__`-prefixed environment variables
//! (e.g. `WARD__SERVER__PORT=8080`). A plain `DATABASE_URL` variable
//! overrides `database.url` for compatibility with hosting platforms.

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl_minutes: i64,
    /// Base URL for password-reset links sent by mail, e.g. the frontend's
    /// `/reset-password` route.
    pub reset_url_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    pub file_rotation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub enabled: bool,
    /// HTTP relay that accepts `{to, subject, body, from}` as JSON.
    pub relay_url: Option<String>,
    pub from: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Pick up a local .env file if present; ignore when missing.
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("server.max_request_body_size", 1024 * 1024)?
            // Database defaults
            .set_default("database.url", "postgres://localhost/ward")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_seconds", 5)?
            // Auth defaults
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("auth.bcrypt_cost", 10)?
            .set_default("auth.reset_token_ttl_minutes", 60)?
            .set_default("auth.reset_url_base", "http://localhost:5173/reset-password")?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("logging.file_enabled", false)?
            .set_default("logging.file_directory", "logs")?
            .set_default("logging.file_prefix", "ward")?
            .set_default("logging.file_rotation", "daily")?
            // Mail defaults
            .set_default("mail.enabled", false)?
            .set_default("mail.from", "no-reply@ward.local")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("WARD")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.auth.jwt_secret.len() < 32 {
            return Err("auth.jwt_secret must be at least 32 bytes".to_string());
        }
        if !(4..=14).contains(&self.auth.bcrypt_cost) {
            return Err("auth.bcrypt_cost must be between 4 and 14".to_string());
        }
        if self.mail.enabled && self.mail.relay_url.is_none() {
            return Err("mail.relay_url is required when mail.enabled is true".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port).parse()?;
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                cors_origins: vec![],
                max_request_body_size: 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/ward".to_string(),
                max_connections: 10,
                acquire_timeout_seconds: 5,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl_hours: 24,
                bcrypt_cost: 10,
                reset_token_ttl_minutes: 60,
                reset_url_base: "http://localhost:5173/reset-password".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                file_enabled: false,
                file_directory: "logs".to_string(),
                file_prefix: "ward".to_string(),
                file_rotation: "daily".to_string(),
            },
            mail: MailConfig {
                enabled: false,
                relay_url: None,
                from: "no-reply@ward.local".to_string(),
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_rejected() {
        let mut config = base_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn mail_enabled_without_relay_rejected() {
        let mut config = base_config();
        config.mail.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let addr = base_config().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:5000");
    }
}
