use std::path::PathBuf;

use anyhow::{Context, bail};

/// Values from sample env files. Never accepted as a signing key.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me", "secret"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("SANTA_JWT_SECRET").context("SANTA_JWT_SECRET is not set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("SANTA_JWT_SECRET is a placeholder, set a real secret");
        }

        let db_path = std::env::var("SANTA_DB_PATH").unwrap_or_else(|_| "santa.db".into());
        let host = std::env::var("SANTA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("SANTA_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("SANTA_PORT must be a port number")?;
        let token_ttl_days: i64 = std::env::var("SANTA_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .context("SANTA_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("SANTA_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            host,
            port,
            token_ttl_days,
        })
    }
}
