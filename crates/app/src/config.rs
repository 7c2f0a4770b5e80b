use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use threadline_infra::db::DbOptions;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(
            non_empty(lookup("THREADLINE_DATA_DIR")).unwrap_or_else(|| "./data".to_string()),
        );
        let database_path = non_empty(lookup("THREADLINE_DATABASE_PATH")).map(PathBuf::from);
        let max_connections = read_number(&lookup, "THREADLINE_MAX_CONNECTIONS", 4u32)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "THREADLINE_MAX_CONNECTIONS",
                max_connections.to_string(),
            ));
        }
        let busy_timeout_secs = read_number(&lookup, "THREADLINE_BUSY_TIMEOUT_SECS", 5u64)?;

        Ok(Self {
            data_dir,
            database_path,
            max_connections,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
        })
    }

    pub fn db_options(&self) -> DbOptions {
        let mut options = match &self.database_path {
            Some(path) => DbOptions::file(path.clone()),
            None => DbOptions::in_data_dir(&self.data_dir),
        };
        options.max_connections = self.max_connections;
        options.busy_timeout = self.busy_timeout;
        options
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(lookup(key)) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key, raw)),
        None => Ok(default),
    }
}

/// Copies `KEY=value` pairs from `.env` into the environment without
/// overriding variables that are already set.
pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = Path::new(".env");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in contents.lines().filter_map(parse_dotenv_line) {
        if std::env::var_os(&key).is_none() {
            // Safety: runs in main before the runtime spawns any other thread.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = [('"', '"'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| value.strip_prefix(*open)?.strip_suffix(*close))
        .unwrap_or(value);
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use threadline_infra::db::DbLocation;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_place_database_in_data_dir() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(
            config.db_options().location,
            DbLocation::File(PathBuf::from("./data").join("comments-db.sqlite3"))
        );
    }

    #[test]
    fn explicit_database_path_wins() {
        let config = config_from(&[
            ("THREADLINE_DATA_DIR", "/tmp/ignored"),
            ("THREADLINE_DATABASE_PATH", "/var/lib/threads.db"),
            ("THREADLINE_MAX_CONNECTIONS", "2"),
        ])
        .unwrap();
        let options = config.db_options();
        assert_eq!(
            options.location,
            DbLocation::File(PathBuf::from("/var/lib/threads.db"))
        );
        assert_eq!(options.max_connections, 2);
    }

    #[test]
    fn reject_bad_numbers() {
        assert!(matches!(
            config_from(&[("THREADLINE_BUSY_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidNumber("THREADLINE_BUSY_TIMEOUT_SECS", _))
        ));
        assert!(matches!(
            config_from(&[("THREADLINE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(..))
        ));
    }

    #[test]
    fn parse_dotenv_line_variants() {
        assert_eq!(
            parse_dotenv_line("export THREADLINE_DATA_DIR=/srv/data"),
            Some(("THREADLINE_DATA_DIR".to_string(), "/srv/data".to_string()))
        );
        assert_eq!(
            parse_dotenv_line(r#"KEY="hello world""#),
            Some(("KEY".to_string(), "hello world".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("KEY='single'"),
            Some(("KEY".to_string(), "single".to_string()))
        );
        assert!(parse_dotenv_line("# comment").is_none());
        assert!(parse_dotenv_line("=value").is_none());
        assert!(parse_dotenv_line("   ").is_none());
    }
}
