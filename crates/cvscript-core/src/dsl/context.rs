//! Runtime context: the dataset being rendered and the active loop bindings

use crate::dataset::{Dataset, Record};
use crate::dsl::ast::AttributeRef;
use crate::error::ResolutionError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Loop alias bound to one record of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub alias: String,
    pub entity: String,
    pub index: usize,
}

/// Per-execution state. The dataset is shared read-only; only the binding
/// stack changes, and only through loop entry and exit.
#[derive(Debug, Clone)]
pub struct Context {
    dataset: Arc<Dataset>,
    /// Entities that exist even when the dataset has no records for them
    declared: BTreeSet<String>,
    bindings: Vec<Binding>,
}

impl Context {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            declared: BTreeSet::new(),
            bindings: Vec::new(),
        }
    }

    /// Treat `entities` as known even if the dataset lacks them
    pub fn with_declared<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Active bindings, outermost first
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn is_known_entity(&self, entity: &str) -> bool {
        self.dataset.contains(entity) || self.declared.contains(entity)
    }

    /// Records of an entity in stored order. Declared entities without data
    /// have none.
    pub fn records(&self, entity: &str) -> Result<&[Record], ResolutionError> {
        match self.dataset.records(entity) {
            Some(records) => Ok(records),
            None if self.declared.contains(entity) => Ok(&[]),
            None => Err(ResolutionError::unknown(entity)),
        }
    }

    pub(crate) fn push_binding(&mut self, alias: &str, entity: &str, index: usize) {
        self.bindings.push(Binding {
            alias: alias.to_string(),
            entity: entity.to_string(),
            index,
        });
    }

    pub(crate) fn pop_binding(&mut self) -> Option<Binding> {
        self.bindings.pop()
    }

    /// The record an entity name or alias denotes, `None` for an entity that
    /// has no records.
    pub fn record_for(&self, name: &str) -> Result<Option<&Record>, ResolutionError> {
        if let Some(binding) = self.bindings.iter().rev().find(|b| b.alias == name) {
            let records = self.records(&binding.entity)?;
            return Ok(records.get(binding.index));
        }

        let records = self.records(name)?;
        if records.len() > 1 {
            tracing::debug!(
                "Direct reference to {} with {} records uses the first",
                name,
                records.len()
            );
        }
        Ok(records.first())
    }

    /// Field value, `None` when the field or the record is absent
    pub fn lookup(&self, attribute: &AttributeRef) -> Result<Option<&str>, ResolutionError> {
        let record = self.record_for(&attribute.entity)?;
        Ok(record
            .and_then(|r| r.get(&attribute.field))
            .map(String::as_str))
    }

    /// Resolve to a string; absent fields resolve to ""
    pub fn resolve(&self, attribute: &AttributeRef) -> Result<String, ResolutionError> {
        Ok(self.lookup(attribute)?.unwrap_or_default().to_string())
    }
}
