use std::{fmt::Display, str::FromStr};

use tracing::{info, warn};

pub const DEFAULT_ADMIN_NICKNAME: &str = "Developer";
pub const DEFAULT_RESERVED_NICKNAMES: [&str; 4] = ["admin", "administrator", "어드민", "운영자"];

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Base url the OAuth providers redirect back to.
    pub public_url: String,
    pub allowed_origin: Option<String>,
    pub client_secret_path: String,
    pub session_secure: bool,
    pub session_idle_minutes: i64,

    /// Email of the administrator. Without it nobody is privileged.
    pub admin_email: Option<String>,
    pub admin_nickname: String,
    pub reserved_nicknames: Vec<String>,
    pub flood_limit: i64,
    pub flood_window_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            database_url: "sqlite://guestbook.db?mode=rwc".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            allowed_origin: None,
            client_secret_path: "client_secret.json".to_owned(),
            session_secure: false,
            session_idle_minutes: 60,
            admin_email: None,
            admin_nickname: DEFAULT_ADMIN_NICKNAME.to_owned(),
            reserved_nicknames: DEFAULT_RESERVED_NICKNAMES.iter().map(|s| s.to_string()).collect(),
            flood_limit: 3,
            flood_window_secs: 120,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Self::default();

        let admin_email = var("ADMIN_EMAIL");
        if admin_email.is_none() {
            warn!("ADMIN_EMAIL not set, nobody will be treated as administrator");
        }

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            public_url: var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_url),
            allowed_origin: var("ALLOWED_ORIGIN"),
            client_secret_path: var("CLIENT_SECRET_PATH").unwrap_or(defaults.client_secret_path),
            session_secure: try_load("SESSION_SECURE", defaults.session_secure),
            session_idle_minutes: try_load("SESSION_IDLE_MINUTES", defaults.session_idle_minutes),
            admin_email,
            admin_nickname: var("ADMIN_NICKNAME").unwrap_or(defaults.admin_nickname),
            reserved_nicknames: var("RESERVED_NICKNAMES")
                .map(|list| parse_list(&list))
                .unwrap_or(defaults.reserved_nicknames),
            flood_limit: try_load("FLOOD_LIMIT", defaults.flood_limit),
            flood_window_secs: try_load("FLOOD_WINDOW_SECS", defaults.flood_window_secs),
        }
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

/// Comma separated list, blanks dropped.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(parse_list(" admin, ,운영자,"), vec!["admin", "운영자"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_defaults_match_flood_policy() {
        let config = Config::default();
        assert_eq!(config.flood_limit, 3);
        assert_eq!(config.flood_window_secs, 120);
        assert!(config.admin_email.is_none());
    }
}
