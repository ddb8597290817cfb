use std::env;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub jwt_expiry_seconds: u64,
    pub currency: String,
    /// Timezone of the digest timer and of mail-pool days.
    pub scheduler_offset: FixedOffset,
    pub digest_send_time: NaiveTime,
    // SMTP (optional)
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_algorithm: parse_jwt_algorithm(
                &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            )?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "900".into())
                .parse()?,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "PLN".into()),
            scheduler_offset: parse_utc_offset(
                &env::var("SCHEDULER_UTC_OFFSET").unwrap_or_else(|_| "+00:00".into()),
            )?,
            digest_send_time: NaiveTime::parse_from_str(
                &env::var("DIGEST_SEND_TIME").unwrap_or_else(|_| "06:00".into()),
                "%H:%M",
            )
            .map_err(|e| anyhow::anyhow!("Invalid DIGEST_SEND_TIME (expected HH:MM): {e}"))?,
            smtp_host: env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_username: env::var("SMTP_USERNAME").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            smtp_from: env::var("SMTP_FROM").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Current time in the scheduler's timezone.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.scheduler_offset)
    }

    /// Calendar day used to key mail-pool entries.
    pub fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_jwt_algorithm(value: &str) -> anyhow::Result<Algorithm> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(anyhow::anyhow!(
            "Unsupported JWT_ALGORITHM: {other} (expected HS256, HS384 or HS512)"
        )),
    }
}

/// Parse an offset such as `+02:00`, `-05:30` or `Z`.
pub fn parse_utc_offset(value: &str) -> anyhow::Result<FixedOffset> {
    let value = value.trim();
    let invalid = || anyhow::anyhow!("Invalid SCHEDULER_UTC_OFFSET: {value} (expected ±HH:MM)");
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    let seconds = (hours * 3600 + minutes * 60) as i32;
    FixedOffset::east_opt(sign * seconds).ok_or_else(invalid)
}
