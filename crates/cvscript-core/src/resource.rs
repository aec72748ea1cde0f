//! Resolution of resource names and lookup keys to files on disk
//!
//! The evaluator only emits names; renderers call a [`ResourceResolver`] to
//! find the file behind a `WRITE logo.png` or `SEARCH_FILE` fragment.

use crate::config::ResourcesConfig;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Refusing resource name '{0}': must be a plain file name")]
    InvalidName(String),
}

pub trait ResourceResolver {
    /// Find the file for `name`, or `None` when nothing matches
    fn resolve(&self, name: &str) -> Result<Option<PathBuf>, ResourceError>;
}

/// Searches a list of directories, trying the bare name first and then each
/// configured extension.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    search_paths: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl DirectoryResolver {
    pub fn new(search_paths: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            search_paths,
            extensions,
        }
    }

    pub fn from_config(config: &ResourcesConfig) -> Self {
        Self::new(config.search_paths.clone(), config.extensions.clone())
    }

    /// Resolve relative search paths against `base`
    pub fn rooted_at(mut self, base: &Path) -> Self {
        for path in &mut self.search_paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Move search paths that lie under `from` to the same place under `to`
    pub fn relocate(mut self, from: &Path, to: &Path) -> Self {
        for path in &mut self.search_paths {
            if let Ok(rest) = path.strip_prefix(from) {
                *path = to.join(rest);
            }
        }
        self
    }

    fn candidates(&self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_string()];
        names.extend(self.extensions.iter().map(|ext| format!("{}.{}", name, ext)));
        names
    }
}

impl ResourceResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Result<Option<PathBuf>, ResourceError> {
        let is_plain = !name.is_empty()
            && Path::new(name)
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            && Path::new(name).components().count() == 1;
        if !is_plain {
            return Err(ResourceError::InvalidName(name.to_string()));
        }

        for dir in &self.search_paths {
            for candidate in self.candidates(name) {
                let path = dir.join(&candidate);
                if path.is_file() {
                    tracing::debug!("Resolved resource '{}' to {}", name, path.display());
                    return Ok(Some(path));
                }
            }
        }

        tracing::debug!("No file found for resource '{}'", name);
        Ok(None)
    }
}
