//! Entity datasets and the providers that load them
//!
//! A dataset maps entity names to ordered records; a record maps field names
//! to string values. The evaluator only reads datasets; loading them is the
//! job of a [`DatasetProvider`].

use crate::config::{EntityShape, EntitySpec, EntityTable};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One record: field name → value
pub type Record = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid data for entity {entity}: {reason}")]
    Shape { entity: String, reason: String },
}

impl From<serde_json::Error> for DatasetError {
    fn from(error: serde_json::Error) -> Self {
        DatasetError::Json(error.to_string())
    }
}

/// Entity name → ordered records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    entities: BTreeMap<String, Vec<Record>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records of `entity`
    pub fn insert(&mut self, entity: impl Into<String>, records: Vec<Record>) {
        self.entities.insert(entity.into(), records);
    }

    pub fn records(&self, entity: &str) -> Option<&[Record]> {
        self.entities.get(entity).map(Vec::as_slice)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entities.keys()
    }

    /// Parse `{ "ENTITY": [ { "field": "value" } ] }`.
    ///
    /// A single object stands for a one-record entity. Numbers and booleans
    /// are stringified, nulls are dropped, nested values are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &JsonValue) -> Result<Self, DatasetError> {
        let object = value.as_object().ok_or_else(|| DatasetError::Shape {
            entity: "<root>".to_string(),
            reason: "expected an object of entities".to_string(),
        })?;

        let mut dataset = Self::new();
        for (entity, records) in object {
            let records = match records {
                JsonValue::Array(items) => items
                    .iter()
                    .map(|item| json_record(entity, item))
                    .collect::<Result<Vec<_>, _>>()?,
                JsonValue::Object(_) => vec![json_record(entity, records)?],
                _ => {
                    return Err(DatasetError::Shape {
                        entity: entity.clone(),
                        reason: "expected an array of records or a single record".to_string(),
                    })
                }
            };
            dataset.insert(entity.clone(), records);
        }

        Ok(dataset)
    }
}

fn json_record(entity: &str, value: &JsonValue) -> Result<Record, DatasetError> {
    let object = value.as_object().ok_or_else(|| DatasetError::Shape {
        entity: entity.to_string(),
        reason: format!("record must be an object, got {}", value),
    })?;

    let mut record = Record::new();
    for (field, value) in object {
        let text = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Null => continue,
            JsonValue::Array(_) | JsonValue::Object(_) => {
                return Err(DatasetError::Shape {
                    entity: entity.to_string(),
                    reason: format!("field '{}' must be a scalar", field),
                })
            }
        };
        record.insert(field.clone(), text);
    }
    Ok(record)
}

/// Supplies the dataset for one execution
pub trait DatasetProvider {
    fn load(&self) -> Result<Dataset, DatasetError>;
}

/// Reads a JSON file in the format accepted by [`Dataset::from_json_str`]
pub struct JsonDatasetProvider {
    path: PathBuf,
}

impl JsonDatasetProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetProvider for JsonDatasetProvider {
    fn load(&self) -> Result<Dataset, DatasetError> {
        let content = read_source(&self.path)?;
        let dataset = Dataset::from_json_str(&content)?;
        tracing::debug!(
            "Loaded {} entities from {}",
            dataset.entities.len(),
            self.path.display()
        );
        Ok(dataset)
    }
}

/// Reads pipe-separated text files named by the entity table
pub struct TableDatasetProvider {
    content_dir: PathBuf,
    entities: EntityTable,
}

impl TableDatasetProvider {
    pub fn new(content_dir: impl Into<PathBuf>, entities: EntityTable) -> Self {
        Self {
            content_dir: content_dir.into(),
            entities,
        }
    }

    fn load_entity(&self, name: &str, spec: &EntitySpec) -> Result<Vec<Record>, DatasetError> {
        let Some(source) = &spec.source else {
            tracing::debug!("Entity {} has no source; it starts empty", name);
            return Ok(Vec::new());
        };

        let path = self.content_dir.join(source);
        let exists = match spec.shape {
            EntityShape::Directory => path.is_dir(),
            EntityShape::Record | EntityShape::Table => path.is_file(),
        };
        if !exists {
            tracing::warn!("Source for entity {} not found at {}", name, path.display());
            return Ok(Vec::new());
        }

        let records = match spec.shape {
            EntityShape::Record => {
                let record = parse_record_text(&read_source(&path)?);
                if record.is_empty() {
                    Vec::new()
                } else {
                    vec![record]
                }
            }
            EntityShape::Table => parse_table_text(&read_source(&path)?, &spec.fields),
            EntityShape::Directory => load_directory(&path)?,
        };

        tracing::debug!("Loaded {} record(s) for {}", records.len(), name);
        Ok(records)
    }
}

impl DatasetProvider for TableDatasetProvider {
    fn load(&self) -> Result<Dataset, DatasetError> {
        let mut dataset = Dataset::new();
        for (name, spec) in self.entities.iter() {
            let records = self.load_entity(name, spec)?;
            dataset.insert(name.clone(), records);
        }
        Ok(dataset)
    }
}

/// One record per `.txt` file, newest name first. A record without a period
/// field takes it from the file name: `opdracht_2020_2022.txt` becomes
/// `2020 – 2022`.
fn load_directory(dir: &Path) -> Result<Vec<Record>, DatasetError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DatasetError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DatasetError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?
            .path();
        let is_text = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if path.is_file() && is_text {
            files.push(path);
        }
    }
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let mut record = parse_record_text(&read_source(&path)?);
        let has_period = ["period", "periode", "PERIODE"]
            .iter()
            .any(|key| record.contains_key(*key));
        if !has_period {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            record.insert("periode".to_string(), period_from_file_name(&file_name));
        }
        records.push(record);
    }
    Ok(records)
}

fn period_from_file_name(file_name: &str) -> String {
    let stem = file_name.strip_prefix("opdracht_").unwrap_or(file_name);
    let stem = stem
        .strip_suffix(".txt")
        .or_else(|| stem.strip_suffix(".TXT"))
        .unwrap_or(stem);
    stem.replace('_', " – ")
}

fn read_source(path: &Path) -> Result<String, DatasetError> {
    std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// A line of backtick-wrapped column names: `` `year`|`name` ``
fn is_backtick_header(line: &str) -> bool {
    let line = line.trim();
    line.contains('|')
        && line.split('|').all(|cell| {
            let cell = cell.trim();
            cell.len() >= 2 && cell.starts_with('`') && cell.ends_with('`')
        })
}

/// Header of a `key|value` source. Besides backtick headers, these start
/// with "attribute" (`attribute|value`). Tables only use backtick headers,
/// so a row like `Attribute-based access control|2020` stays data there.
fn is_attribute_header(line: &str) -> bool {
    line.trim().to_lowercase().starts_with("attribute") || is_backtick_header(line)
}

fn is_skippable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

fn clean_key(key: &str) -> String {
    key.trim()
        .trim_matches(|c| c == '`' || c == '\'' || c == '"')
        .trim()
        .to_string()
}

/// `key|value` lines into one record. A line without `|` continues the
/// previous value on a new line.
pub fn parse_record_text(text: &str) -> Record {
    let mut record = Record::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if is_skippable(line) || is_attribute_header(line) {
            continue;
        }

        match line.split_once('|') {
            Some((key, value)) => {
                let key = clean_key(key);
                if key.is_empty() {
                    continue;
                }
                record.insert(key.clone(), value.trim().to_string());
                current = Some(key);
            }
            None => {
                if let Some(value) = current.as_ref().and_then(|key| record.get_mut(key)) {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(line.trim_end());
                }
            }
        }
    }

    record
}

/// `a|b|c` lines into records. Field names come from a backtick header line
/// when present, then from `fields`, then `col<N>`.
pub fn parse_table_text(text: &str, fields: &[String]) -> Vec<Record> {
    let mut header: Option<Vec<String>> = None;
    let mut records = Vec::new();

    for line in text.lines() {
        if is_skippable(line) {
            continue;
        }
        if is_backtick_header(line) {
            if header.is_none() {
                header = Some(line.split('|').map(clean_key).collect());
            }
            continue;
        }

        let names = header.as_deref().unwrap_or(fields);
        let record: Record = line
            .split('|')
            .map(str::trim)
            .enumerate()
            .map(|(i, cell)| {
                let name = names.get(i).cloned().unwrap_or_else(|| format!("col{}", i));
                (name, cell.to_string())
            })
            .collect();
        records.push(record);
    }

    records
}
