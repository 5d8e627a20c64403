use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// When set, protected routes also require a matching `X-ApiKey` header.
    pub api_key: Option<String>,
    pub jwt_expiration_hours: u64,
    pub time_zone: Tz,
    pub server_addr: SocketAddr,
    pub db_max_connections: u32,
    /// Empty means any origin.
    pub cors_allow_origins: Vec<String>,
    pub status_catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let api_key = optional_var("API_KEY");

        let jwt_expiration_hours = parse_var("JWT_EXPIRATION_HOURS", 8)?;

        let time_zone_name =
            env::var("APP_TIMEZONE").unwrap_or_else(|_| "Asia/Bangkok".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let server_addr = parse_var("SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 10)?;

        let cors_allow_origins = optional_var("CORS_ALLOW_ORIGINS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();
        let status_catalog_path = optional_var("STATUS_CATALOG_PATH").map(PathBuf::from);

        Ok(Config {
            database_url,
            jwt_secret,
            api_key,
            jwt_expiration_hours,
            time_zone,
            server_addr,
            db_max_connections,
            cors_allow_origins,
            status_catalog_path,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid {} value {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_drops_blank_items() {
        assert_eq!(
            parse_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn parse_var_reports_variable_name() {
        env::set_var("VMS_TEST_DB_MAX_CONNECTIONS", "many");
        let err = parse_var::<u32>("VMS_TEST_DB_MAX_CONNECTIONS", 10).unwrap_err();
        assert!(err.to_string().contains("VMS_TEST_DB_MAX_CONNECTIONS"));
        env::remove_var("VMS_TEST_DB_MAX_CONNECTIONS");

        assert_eq!(parse_var::<u32>("VMS_TEST_UNSET_VARIABLE", 7).unwrap(), 7);
    }
}
