//! Configuration for cvscript
//!
//! Holds the entity table consulted by the parser and the dataset providers,
//! the resource search paths, and the logging level. Values come from
//! defaults, an optional TOML file, and `CVSCRIPT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub content: ContentConfig,
    /// Recognized entities, keyed by the name scripts use
    pub entities: EntityTable,
    pub resources: ResourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Base directory for entity sources
    pub dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("content"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directories searched in order
    pub search_paths: Vec<PathBuf>,
    /// Suffixes tried after the bare name, without the leading dot
    pub extensions: Vec<String>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![
                PathBuf::from("content/pictures"),
                PathBuf::from("content/blocks"),
                PathBuf::from("content"),
            ],
            extensions: ["txt", "png", "jpg", "jpeg", "webp", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// How an entity's source file is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityShape {
    /// `key|value` lines forming a single record
    Record,
    /// One record per `a|b|c` line
    Table,
    /// A directory with one `key|value` file per record
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySpec {
    pub shape: EntityShape,
    /// Source file relative to the content directory
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Column names for tables without a header line
    #[serde(default)]
    pub fields: Vec<String>,
}

impl EntitySpec {
    pub fn record(source: &str) -> Self {
        Self {
            shape: EntityShape::Record,
            source: Some(PathBuf::from(source)),
            fields: Vec::new(),
        }
    }

    pub fn directory(source: &str) -> Self {
        Self {
            shape: EntityShape::Directory,
            source: Some(PathBuf::from(source)),
            fields: Vec::new(),
        }
    }

    pub fn table(source: &str, fields: &[&str]) -> Self {
        Self {
            shape: EntityShape::Table,
            source: Some(PathBuf::from(source)),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Entity name → expected shape and source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EntityTable {
    entries: BTreeMap<String, EntitySpec>,
}

impl Default for EntityTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("PERSONAL", EntitySpec::record("personal-data.txt"));
        table.insert("URLS", EntitySpec::record("urls-contact.txt"));
        table.insert(
            "EDUCATION",
            EntitySpec::table("educations.txt", &["period", "name", "institute", "place", "note"]),
        );
        table.insert(
            "CERTIFICATIONS",
            EntitySpec::table("certifications.txt", &["year", "name", "organization"]),
        );
        table.insert("COURSES", EntitySpec::table("courses.txt", &["period", "name"]));
        table.insert("BLOCK", EntitySpec::table("blocks.txt", &["name", "title"]));
        table.insert("ENGAGEMENTS", EntitySpec::directory("engagements"));
        table
    }
}

impl EntityTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: EntitySpec) {
        self.entries.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&EntitySpec> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entity names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntitySpec)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const RESERVED_WORDS: &[&str] = &[
    "FUNCTION", "WRITE", "IF", "ELSE", "END", "DO", "IN", "SEARCH_FILE", "EMPTY",
];

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Override values from `CVSCRIPT_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = env::var("CVSCRIPT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(dir) = env::var("CVSCRIPT_CONTENT_DIR") {
            self.content.dir = PathBuf::from(dir);
        }

        if let Some(paths) = env::var_os("CVSCRIPT_RESOURCE_PATHS") {
            let paths: Vec<PathBuf> = env::split_paths(&paths).collect();
            if paths.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "CVSCRIPT_RESOURCE_PATHS".to_string(),
                    reason: "No paths given".to_string(),
                });
            }
            self.resources.search_paths = paths;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                reason: format!("Must be one of: {}", valid_levels.join(", ")),
            });
        }

        for (name, spec) in self.entities.iter() {
            if !is_identifier(name) || RESERVED_WORDS.contains(&name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("entities.{}", name),
                    reason: "Entity names must be identifiers and not reserved words".to_string(),
                });
            }
            if let Some(source) = &spec.source {
                if source.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: format!("entities.{}.source", name),
                        reason: "Source path cannot be empty".to_string(),
                    });
                }
            }
        }

        for ext in &self.resources.extensions {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(ConfigError::InvalidValue {
                    key: "resources.extensions".to_string(),
                    reason: format!("Invalid extension '{}': give it without a leading dot", ext),
                });
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
