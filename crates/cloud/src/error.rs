//! Error types for the asset store and export layer.

use thiserror::Error;

use crate::service::AssetType;

/// Errors produced by compute/storage collaborators and the export planner.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("asset {path} is a {actual}, expected {expected}")]
    AssetType {
        path: String,
        expected: String,
        actual: AssetType,
    },

    #[error("collection {0} has no dated images")]
    EmptyCollection(String),

    #[error("invalid asset path: {0}")]
    InvalidPath(String),

    #[error("task {id}: {reason}")]
    Task { id: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] snowcover_core::Error),
}

impl CloudError {
    pub(crate) fn task(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Task {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
