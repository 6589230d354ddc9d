use std::str::FromStr;

use anyhow::Context;

use crate::meals::filter::DEFAULT_CALORIES_PER_DAY;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub default_calories_per_day: i32,
    pub seed_demo_data: bool,
}

/// `default` when `key` is unset; an error when it is set but unparsable.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "topjava".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "topjava-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let default_calories_per_day = env_or("DEFAULT_CALORIES_PER_DAY", DEFAULT_CALORIES_PER_DAY)?;
        anyhow::ensure!(
            default_calories_per_day >= 0,
            "DEFAULT_CALORIES_PER_DAY must not be negative"
        );

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            jwt,
            default_calories_per_day,
            seed_demo_data: env_or("SEED_DEMO_DATA", true)?,
        })
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            default_calories_per_day: DEFAULT_CALORIES_PER_DAY,
            seed_demo_data: true,
        }
    }
}
