//! Loading and saving knowledge base documents.
//!
//! The knowledge base is a directory tree: each sub-directory of the base
//! path is a category, and each `*.json` file inside it is one item whose
//! identifier is the file stem.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::errors::KnowledgeError;

lazy_static! {
    // Category and item names become path components
    static ref SAFE_NAME: Regex =
        Regex::new(r"^[\w\- ]+$").expect("Safe name pattern should be valid");
}

/// Reject names that could escape the knowledge base directory
pub fn validate_name(name: &str) -> Result<(), KnowledgeError> {
    if SAFE_NAME.is_match(name) && !name.trim().is_empty() {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidName(name.to_string()))
    }
}

/// Whether a document carries no content worth saving
fn is_empty_document(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Reads and writes knowledge documents under a base directory
#[derive(Debug, Clone)]
pub struct KnowledgeLoader {
    base_path: PathBuf,
}

impl KnowledgeLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!(base_path = %base_path.display(), "Initialized knowledge loader");
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Sorted category names. Directories starting with `__` are ignored.
    pub fn get_categories(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) => {
                error!(base_path = %self.base_path.display(), error = %e, "Failed to list knowledge categories");
                return Vec::new();
            }
        };

        let mut categories: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with("__"))
            .collect();
        categories.sort();
        categories
    }

    /// Sorted `*.json` files of a category
    pub(crate) fn json_files(&self, category: &str) -> Result<Vec<PathBuf>, KnowledgeError> {
        validate_name(category)?;
        let category_path = self.base_path.join(category);
        if !category_path.is_dir() {
            return Err(KnowledgeError::CategoryNotFound(category.to_string()));
        }

        let entries = fs::read_dir(&category_path).map_err(|source| KnowledgeError::Io {
            path: category_path.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Read one document file. Empty or whitespace-only files yield `None`.
    pub(crate) fn read_document(path: &Path) -> Result<Option<Value>, KnowledgeError> {
        let content = fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            error!(path = %path.display(), "Knowledge file is empty");
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| KnowledgeError::MalformedJson {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Load every item of a category, keyed by item id.
    ///
    /// Empty and malformed files are logged and skipped; a missing category
    /// is an error.
    pub fn load_category(&self, category: &str) -> Result<BTreeMap<String, Value>, KnowledgeError> {
        let files = self.json_files(category).inspect_err(|e| {
            error!(category, error = %e, "Failed to load knowledge category");
        })?;

        let mut result = BTreeMap::new();
        for path in files {
            let Some(item_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::read_document(&path) {
                Ok(Some(data)) => {
                    debug!(path = %path.display(), "Loaded knowledge file");
                    result.insert(item_id.to_string(), data);
                }
                Ok(None) => {}
                Err(e) => error!(path = %path.display(), error = %e, "Skipping knowledge file"),
            }
        }
        Ok(result)
    }

    /// Load a single item. Missing or empty files yield `None`; malformed
    /// JSON is reported as an error.
    pub fn load_item(&self, category: &str, item_id: &str) -> Result<Option<Value>, KnowledgeError> {
        validate_name(category)?;
        validate_name(item_id)?;

        let path = self.base_path.join(category).join(format!("{item_id}.json"));
        if !path.is_file() {
            warn!(category, item_id, "Knowledge item not found");
            return Ok(None);
        }

        Self::read_document(&path).inspect_err(|e| {
            error!(category, item_id, error = %e, "Failed to load knowledge item");
        })
    }

    /// Save an item, creating the category directory when needed
    pub fn save_item(&self, category: &str, item_id: &str, data: &Value) -> Result<(), KnowledgeError> {
        validate_name(category)?;
        validate_name(item_id)?;

        if is_empty_document(data) {
            error!(item_id, "Attempt to save empty knowledge document");
            return Err(KnowledgeError::EmptyDocument(item_id.to_string()));
        }

        let path = self.base_path.join(category).join(format!("{item_id}.json"));
        crate::storage::write_json_atomically(&path, data)?;

        info!(category, item_id, "Knowledge item saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("materials").is_ok());
        assert!(validate_name("Отделка стен").is_ok());
        assert!(validate_name("tile-adhesive_2").is_ok());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_is_empty_document() {
        assert!(is_empty_document(&json!({})));
        assert!(is_empty_document(&json!(null)));
        assert!(is_empty_document(&json!([])));
        assert!(!is_empty_document(&json!({"title": "x"})));
    }
}
