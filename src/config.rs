use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recommend::{Aggregation, MergePolicy};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logformat: LogFormat,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            dbdir: None,
            database: DatabaseConfig::default(),
            logformat: LogFormat::default(),
            auth: AuthConfig::default(),
            recommendations: RecommendationConfig::default(),
            debug_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_recommendation_count")]
    pub count: usize,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub merge: MergePolicy,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            count: default_recommendation_count(),
            aggregation: Aggregation::default(),
            merge: MergePolicy::default(),
        }
    }
}

fn default_port() -> String {
    "8000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_recommendation_count() -> usize {
    5
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("libris.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.listen.port, "8000");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.recommendations.count, 5);
        assert_eq!(config.recommendations.aggregation, Aggregation::Last);
        assert_eq!(config.recommendations.merge, MergePolicy::Distinct);
        assert_eq!(config.logformat, LogFormat::Text);
        assert!(config.get_database_path().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
            listen:
              address: 127.0.0.1
              port: "9000"
            dbdir: /var/lib/libris
            logformat: json
            auth:
              bcrypt_cost: 4
            recommendations:
              count: 3
              aggregation: mean
              merge: concatenate
        "#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.listen.port, "9000");
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert_eq!(config.logformat, LogFormat::Json);
        assert_eq!(config.recommendations.count, 3);
        assert_eq!(config.recommendations.aggregation, Aggregation::Mean);
        assert_eq!(config.recommendations.merge, MergePolicy::Concatenate);
        assert_eq!(
            config.get_database_path(),
            Some("/var/lib/libris/libris.db".to_string())
        );
    }

    #[test]
    fn test_sqlite_filename_wins_over_dbdir() {
        let yaml = r#"
            dbdir: /tmp
            database:
              sqlite:
                filename: /data/books.db
        "#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.get_database_path(), Some("/data/books.db".to_string()));
    }
}
