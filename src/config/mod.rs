use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;
use time::UtcOffset;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
    pub push_endpoint: Option<String>,
    pub push_api_key: Option<String>,
    pub push_timeout_seconds: u64,
    /// Fixed offset all messes operate in; mess-cut eligibility is
    /// computed against this zone rather than whatever the host is set to.
    pub mess_tz: UtcOffset,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        SocketAddr::from_str(&http_addr).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            paseto_refresh_key: env_key_32("PASETO_REFRESH_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "15")?,
            refresh_ttl_days: env_or_parse("REFRESH_TTL_DAYS", "30")?,
            push_endpoint: std::env::var("PUSH_ENDPOINT").ok(),
            push_api_key: std::env::var("PUSH_API_KEY").ok(),
            push_timeout_seconds: env_or_parse("PUSH_TIMEOUT_SECONDS", "5")?,
            mess_tz: parse_offset(&env_or("MESS_TZ_OFFSET", "+05:30"))?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

/// Parses offsets of the form `+05:30` / `-03:00`.
pub fn parse_offset(value: &str) -> Result<UtcOffset> {
    let err = || anyhow!("invalid MESS_TZ_OFFSET: expected e.g. +05:30, got {:?}", value);

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1i8, &value[1..]),
        Some(b'-') => (-1i8, &value[1..]),
        _ => return Err(err()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(err)?;
    let hours: i8 = hours.parse().map_err(|_| err())?;
    let minutes: i8 = minutes.parse().map_err(|_| err())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(err());
    }

    UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_offset() {
        let offset = parse_offset("+05:30").unwrap();
        assert_eq!(offset.whole_seconds(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn parses_negative_offset() {
        let offset = parse_offset("-03:00").unwrap();
        assert_eq!(offset.whole_seconds(), -3 * 3600);
    }

    #[test]
    fn parses_utc() {
        assert_eq!(parse_offset("+00:00").unwrap(), UtcOffset::UTC);
    }

    #[test]
    fn rejects_malformed_offsets() {
        for bad in ["", "05:30", "+5", "+24:00", "+05:70", "+aa:bb"] {
            assert!(parse_offset(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
