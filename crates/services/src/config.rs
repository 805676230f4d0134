use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use storage::rest::{DEFAULT_AUTH_URL, RestConfig};

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://progress.sqlite3";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read from `PROGRESS_*` environment variables.
///
/// The remote backend is only configured when both the database URL and the
/// API key are present and non-blank.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub db_url: String,
    pub remote: Option<RestConfig>,
    pub start_online: bool,
}

impl SyncConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a numeric or boolean variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_url = non_blank("PROGRESS_DB_URL")
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);

        let timeout_secs = match non_blank("PROGRESS_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PROGRESS_HTTP_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let start_online = match non_blank("PROGRESS_START_ONLINE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: "PROGRESS_START_ONLINE",
                value: raw,
            })?,
            None => true,
        };

        let remote = match (non_blank("PROGRESS_REMOTE_URL"), non_blank("PROGRESS_API_KEY")) {
            (Some(database_url), Some(api_key)) => Some(RestConfig {
                database_url,
                auth_url: non_blank("PROGRESS_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.into()),
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            }),
            _ => None,
        };

        Ok(Self {
            db_url,
            remote,
            start_online,
        })
    }
}

/// Turns `path`, `sqlite:path` or a relative path into an absolute
/// `sqlite://` URL. `sqlite://` URLs and `sqlite::memory:` pass through.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_remote() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert!(config.remote.is_none());
        assert!(config.start_online);
    }

    #[test]
    fn remote_needs_url_and_key() {
        let config =
            SyncConfig::from_lookup(lookup(&[("PROGRESS_REMOTE_URL", "https://db.example")]))
                .unwrap();
        assert!(config.remote.is_none());

        let config = SyncConfig::from_lookup(lookup(&[
            ("PROGRESS_REMOTE_URL", "https://db.example"),
            ("PROGRESS_API_KEY", "key"),
            ("PROGRESS_HTTP_TIMEOUT_SECS", "3"),
            ("PROGRESS_START_ONLINE", "off"),
        ]))
        .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(remote.timeout, Duration::from_secs(3));
        assert!(!config.start_online);
    }

    #[test]
    fn db_url_from_env_is_normalized() {
        let config =
            SyncConfig::from_lookup(lookup(&[("PROGRESS_DB_URL", "data/progress.db")])).unwrap();
        assert!(config.db_url.starts_with("sqlite:///"));
        assert!(config.db_url.ends_with("data/progress.db"));

        let config =
            SyncConfig::from_lookup(lookup(&[("PROGRESS_DB_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.db_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = SyncConfig::from_lookup(lookup(&[("PROGRESS_HTTP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("PROGRESS_HTTP_TIMEOUT_SECS"));

        assert!(SyncConfig::from_lookup(lookup(&[("PROGRESS_START_ONLINE", "maybe")])).is_err());
    }
}
