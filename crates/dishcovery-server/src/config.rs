use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::info;

/// Signing secrets that must be replaced before going live.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub token_ttl: chrono::Duration,
    /// Usernames promoted to admin at startup.
    pub admins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let ttl_minutes: i64 = try_load("DISHCOVERY_TOKEN_TTL_MINUTES", "60")?;
        if ttl_minutes <= 0 {
            anyhow::bail!("DISHCOVERY_TOKEN_TTL_MINUTES must be positive, got {ttl_minutes}");
        }

        Ok(Self {
            host: load("DISHCOVERY_HOST", "0.0.0.0"),
            port: try_load("DISHCOVERY_PORT", "5000")?,
            db_path: load("DISHCOVERY_DB_PATH", "dishcovery.db").into(),
            jwt_secret: load("DISHCOVERY_JWT_SECRET", "dev-secret-change-me"),
            upload_dir: load("DISHCOVERY_UPLOAD_DIR", "./uploads").into(),
            token_ttl: chrono::Duration::minutes(ttl_minutes),
            admins: parse_admins(&load("DISHCOVERY_ADMINS", "")),
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

fn load(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = load(key, default);
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value '{raw}'"))
}

fn parse_admins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_ignores_blanks() {
        assert_eq!(parse_admins(" alice, ,bob,"), vec!["alice", "bob"]);
        assert!(parse_admins("").is_empty());
    }

    #[test]
    fn placeholder_secret_is_detected() {
        let config = Config {
            host: "0.0.0.0".into(),
            port: 5000,
            db_path: "x.db".into(),
            jwt_secret: "dev-secret-change-me".into(),
            upload_dir: "./uploads".into(),
            token_ttl: chrono::Duration::minutes(60),
            admins: Vec::new(),
        };
        assert!(config.uses_placeholder_secret());
    }
}
