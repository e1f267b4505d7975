//! # Error Types Module
//!
//! Error types for the storage and knowledge base layers. Handlers wrap
//! these in `anyhow::Error`; wizard validation failures are localization
//! keys instead and never reach this module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing per-user JSON files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error for {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    #[error("Index {index} out of range ({len} records)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Record at index {index} has changed")]
    RecordChanged { index: usize },
}

/// Errors raised by the knowledge base loader
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Category '{0}' not found")]
    CategoryNotFound(String),
    #[error("Invalid path component: '{0}'")]
    InvalidName(String),
    #[error("Refusing to save empty document for item '{0}'")]
    EmptyDocument(String),
    #[error("Malformed JSON in {path}: {source}")]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
