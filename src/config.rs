use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{MaxSize, SplitMode};
use crate::error::RetrieverError;

pub const DEFAULT_CONFIG_FILE: &str = "sra-retriever.json";
pub const DEFAULT_HISTORY_QUERY: &str = "SELECT SRA FROM sra_table";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub toolkit_dir: Option<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub identifier_log: Option<String>,
    #[serde(default)]
    pub error_log: Option<String>,
    #[serde(default)]
    pub max_prefetch_size: Option<String>,
    #[serde(default)]
    pub split: Option<SplitMode>,
    #[serde(default)]
    pub verify_input: Option<bool>,
    #[serde(default)]
    pub validate_data: Option<bool>,
    #[serde(default)]
    pub history: Option<HistoryEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub database: String,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySettings {
    pub database: Utf8PathBuf,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub toolkit_dir: Option<Utf8PathBuf>,
    pub work_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
    pub identifier_log: String,
    pub error_log: String,
    pub max_prefetch_size: MaxSize,
    pub split: SplitMode,
    pub verify_input: bool,
    pub validate_data: bool,
    pub history: Option<HistorySettings>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            toolkit_dir: None,
            work_dir: Utf8PathBuf::from("."),
            output_dir: Utf8PathBuf::from("raw_sequence_data"),
            log_dir: Utf8PathBuf::from("SRA-Numbers"),
            identifier_log: "sra-log".to_string(),
            error_log: "error-log.tsv".to_string(),
            max_prefetch_size: MaxSize::default(),
            split: SplitMode::default(),
            verify_input: true,
            validate_data: true,
            history: None,
        }
    }
}

impl ResolvedConfig {
    pub fn identifier_log_path(&self) -> Utf8PathBuf {
        self.log_dir.join(&self.identifier_log)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config at `path`, or `sra-retriever.json` in the current
    /// directory. A missing default file yields the built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RetrieverError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| RetrieverError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RetrieverError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, RetrieverError> {
        let defaults = ResolvedConfig::default();

        let max_prefetch_size = config
            .max_prefetch_size
            .map(|value| value.parse::<MaxSize>())
            .transpose()?
            .unwrap_or(defaults.max_prefetch_size);

        let history = config.history.map(|entry| HistorySettings {
            database: Utf8PathBuf::from(entry.database),
            query: entry
                .query
                .unwrap_or_else(|| DEFAULT_HISTORY_QUERY.to_string()),
        });

        Ok(ResolvedConfig {
            toolkit_dir: config.toolkit_dir.map(Utf8PathBuf::from),
            work_dir: config
                .work_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.output_dir),
            log_dir: config
                .log_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.log_dir),
            identifier_log: config.identifier_log.unwrap_or(defaults.identifier_log),
            error_log: config.error_log.unwrap_or(defaults.error_log),
            max_prefetch_size,
            split: config.split.unwrap_or(defaults.split),
            verify_input: config.verify_input.unwrap_or(defaults.verify_input),
            validate_data: config.validate_data.unwrap_or(defaults.validate_data),
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.max_prefetch_size.as_str(), "70G");
        assert_eq!(resolved.split, SplitMode::Split3);
        assert_eq!(resolved.identifier_log_path(), "SRA-Numbers/sra-log");
        assert!(resolved.verify_input);
        assert!(resolved.history.is_none());
    }

    #[test]
    fn history_gets_default_query() {
        let config: Config =
            serde_json::from_str(r#"{"history": {"database": "past.sqlite"}}"#).unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        let history = resolved.history.unwrap();
        assert_eq!(history.database, "past.sqlite");
        assert_eq!(history.query, DEFAULT_HISTORY_QUERY);
    }

    #[test]
    fn rejects_bad_size() {
        let config = Config {
            max_prefetch_size: Some("lots".to_string()),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(RetrieverError::InvalidMaxSize(_))
        );
    }
}
