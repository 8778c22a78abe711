//! Pipeline configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. TOML file (`--config` or `COURTSIDE_CONFIG`)
//! 3. environment (`COURTSIDE_DB_PATH`; `COURTSIDE_HOME` moves the default database)
//! 4. command-line flags, applied by the caller before [`PipelineConfig::validate`]
//!
//! ```toml
//! seasons = ["2021-22", "2022-23"]
//! concurrency = 2
//!
//! [retry]
//! max_attempts = 4
//! backoff_factor = 1.5
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::WorkUnitKey;
use crate::retry::RetryPolicy;
use crate::{LoadMode, ValidationError, WarehouseConfig};

pub const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG";
pub const DB_PATH_ENV: &str = "COURTSIDE_DB_PATH";

/// Seasons ingested when none are configured.
pub const DEFAULT_SEASONS: [&str; 5] = ["2018-19", "2019-20", "2020-21", "2021-22", "2022-23"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Retry knobs as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub max_delay_secs: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_factor: policy.backoff_factor,
            max_delay_secs: policy.max_delay.as_secs(),
            jitter: policy.jitter,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_secs(self.max_delay_secs),
            jitter: self.jitter,
            ..RetryPolicy::default()
        }
    }
}

/// Upstream endpoint and the static headers it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub endpoint: String,
    pub league_id: String,
    pub season_type: String,
    /// `P` for player rows, `T` for team rows.
    pub player_or_team: String,
    pub sorter: String,
    pub direction: String,
    pub headers: BTreeMap<String, String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        let headers = [
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/122.0 Safari/537.36",
            ),
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Referer", "https://www.nba.com/"),
            ("Origin", "https://www.nba.com"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

        Self {
            base_url: String::from("https://stats.nba.com/stats"),
            endpoint: String::from("leaguegamelog"),
            league_id: String::from("00"),
            season_type: String::from("Regular Season"),
            player_or_team: String::from("P"),
            sorter: String::from("DATE"),
            direction: String::from("ASC"),
            headers,
        }
    }
}

impl UpstreamConfig {
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Database file; `None` means `$COURTSIDE_HOME/nba.duckdb`.
    pub db_path: Option<PathBuf>,
    pub seasons: Vec<String>,
    pub retry: RetrySettings,
    pub request_timeout_ms: u64,
    /// Minimum gap between requests; 0 disables pacing.
    pub min_request_interval_ms: u64,
    pub concurrency: usize,
    pub load_mode: LoadMode,
    pub upstream: UpstreamConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            seasons: DEFAULT_SEASONS.iter().map(ToString::to_string).collect(),
            retry: RetrySettings::default(),
            request_timeout_ms: 45_000,
            min_request_interval_ms: 600,
            concurrency: 1,
            load_mode: LoadMode::Append,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the config file (explicit path or `COURTSIDE_CONFIG`), then environment.
    ///
    /// Validation is left to the caller so command-line overrides can be applied first.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty());

        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = lookup(DB_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            self.db_path = Some(PathBuf::from(db_path));
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seasons.is_empty() {
            return Err(ValidationError::NoSeasons);
        }
        for season in &self.seasons {
            WorkUnitKey::parse(season)?;
        }
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor <= 0.0 {
            return Err(ValidationError::InvalidBackoffFactor {
                value: self.retry.backoff_factor,
            });
        }
        if self.concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        if self.request_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        let base_url = self.upstream.base_url.as_str();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl {
                value: base_url.to_string(),
            });
        }
        Ok(())
    }

    /// Configured seasons as work units, in configured order.
    pub fn work_units(&self) -> Result<Vec<WorkUnitKey>, ValidationError> {
        self.seasons
            .iter()
            .map(|season| WorkUnitKey::parse(season))
            .collect()
    }

    pub fn warehouse_config(&self) -> WarehouseConfig {
        match &self.db_path {
            Some(path) => WarehouseConfig::at(path.clone()),
            None => WarehouseConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_upstream_conventions() {
        let config = PipelineConfig::default();

        assert_eq!(config.seasons.len(), 5);
        assert_eq!(config.seasons[0], "2018-19");
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.request_timeout_ms, 45_000);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.load_mode, LoadMode::Append);
        assert_eq!(
            config.upstream.endpoint_url(),
            "https://stats.nba.com/stats/leaguegamelog"
        );
        for header in ["User-Agent", "Accept", "Accept-Language", "Referer", "Origin"] {
            assert!(config.upstream.headers.contains_key(header), "{header}");
        }
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn file_values_override_defaults_and_keep_the_rest() {
        let config = PipelineConfig::from_toml_str(
            r#"
seasons = ["2021-22"]
concurrency = 3
load_mode = "replace_units"

[retry]
backoff_factor = 1.5
"#,
        )
        .expect("parse");

        assert_eq!(config.seasons, vec!["2021-22".to_string()]);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.load_mode, LoadMode::ReplaceUnits);
        assert_eq!(config.retry.backoff_factor, 1.5);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.upstream.league_id, "00");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = PipelineConfig::from_toml_str("max_retries = 3\n").expect_err("unknown key");
        assert!(error.to_string().contains("max_retries"));
    }

    #[test]
    fn environment_overrides_db_path() {
        let mut config = PipelineConfig::default();

        config.apply_env(|name| (name == DB_PATH_ENV).then(|| "/tmp/courtside.duckdb".to_string()));

        assert_eq!(
            config.warehouse_config().db_path,
            PathBuf::from("/tmp/courtside.duckdb")
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("courtside.toml");
        fs::write(&path, "seasons = [\"2019-20\", \"2020-21\"]\n").expect("write config");

        let config = PipelineConfig::load(Some(path.as_path())).expect("load");

        let units = config.work_units().expect("units");
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].as_str(), "2020-21");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempdir().expect("tempdir");

        let error = PipelineConfig::from_file(&temp.path().join("absent.toml")).expect_err("missing");

        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut config = PipelineConfig::default();
        config.retry.max_attempts = 0;
        assert_eq!(config.validate(), Err(ValidationError::ZeroAttempts));

        let mut config = PipelineConfig::default();
        config.retry.backoff_factor = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBackoffFactor { .. })
        ));

        let mut config = PipelineConfig::default();
        config.seasons.clear();
        assert_eq!(config.validate(), Err(ValidationError::NoSeasons));

        let mut config = PipelineConfig::default();
        config.concurrency = 0;
        assert_eq!(config.validate(), Err(ValidationError::ZeroConcurrency));
    }

    #[test]
    fn retry_settings_build_policy() {
        let settings = RetrySettings {
            max_attempts: 3,
            backoff_factor: 3.0,
            max_delay_secs: 20,
            jitter: false,
        };

        let policy = settings.policy();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after_attempt(2), Duration::from_secs(9));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_secs(20));
    }
}
