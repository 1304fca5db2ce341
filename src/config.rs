//! Mapping configuration

use crate::rdf::{is_absolute_iri, NamespaceManager};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Namespace used for relative names when nothing else provides one
pub const DEFAULT_NAMESPACE: &str = "urn:samyama:ogm:";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How solution counts are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStrategy {
    /// Aggregate when the store evaluates `COUNT` itself, else materialize
    #[default]
    Auto,
    /// Fetch every solution and count them
    Materialize,
    /// Ask the store for a single `COUNT` binding
    Aggregate,
}

/// Mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Global namespace for relative names. When unset, the store's default
    /// (`""`) prefix is used, then [`DEFAULT_NAMESPACE`].
    pub default_namespace: Option<String>,

    /// Extra prefixes, registered on top of the common ones
    pub namespaces: IndexMap<String, String>,

    pub count_strategy: CountStrategy,

    /// Accept create/save of entities without any populated property
    pub allow_empty_entities: bool,

    /// Connection limit of the in-memory store
    pub max_connections: Option<usize>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            default_namespace: None,
            namespaces: IndexMap::new(),
            count_strategy: CountStrategy::Auto,
            allow_empty_entities: true,
            max_connections: None,
        }
    }
}

impl MappingConfig {
    /// Create a configuration with a global default namespace
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: Some(default_namespace.into()),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a `.yaml`, `.yml` or `.json` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(
                    path.display().to_string(),
                ))
            }
        };
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Check namespaces are absolute and limits are usable
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ns) = &self.default_namespace {
            if !is_absolute_iri(ns) {
                return Err(ConfigError::Invalid(format!(
                    "default namespace {} is not an absolute IRI",
                    ns
                )));
            }
        }
        for (prefix, iri) in &self.namespaces {
            if !is_absolute_iri(iri) {
                return Err(ConfigError::Invalid(format!(
                    "namespace {} -> {} is not an absolute IRI",
                    prefix, iri
                )));
            }
        }
        if self.max_connections == Some(0) {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Common prefixes plus the configured ones
    pub fn namespace_manager(&self) -> NamespaceManager {
        let mut manager = NamespaceManager::new();
        for (prefix, iri) in &self.namespaces {
            manager.add_prefix(prefix.clone(), iri.clone());
        }
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MappingConfig::default();
        assert!(config.allow_empty_entities);
        assert_eq!(config.count_strategy, CountStrategy::Auto);
        assert!(config.default_namespace.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = MappingConfig::from_yaml_str(
            r#"
default_namespace: "http://example.org/wine#"
namespaces:
  ex: "http://example.org/"
count_strategy: materialize
allow_empty_entities: false
"#,
        )
        .unwrap();
        assert_eq!(
            config.default_namespace.as_deref(),
            Some("http://example.org/wine#")
        );
        assert_eq!(config.count_strategy, CountStrategy::Materialize);
        assert!(!config.allow_empty_entities);
        assert_eq!(
            config.namespace_manager().expand("ex:thing").unwrap(),
            "http://example.org/thing"
        );
    }

    #[test]
    fn test_invalid_namespace() {
        let result = MappingConfig::from_json_str(r#"{"default_namespace": "not absolute"}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = MappingConfig::from_json_str(r#"{"max_connections": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"count_strategy": "aggregate", "max_connections": 4}}"#).unwrap();
        let config = MappingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.count_strategy, CountStrategy::Aggregate);
        assert_eq!(config.max_connections, Some(4));

        let other = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            MappingConfig::from_file(other.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
