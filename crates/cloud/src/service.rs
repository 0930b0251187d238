//! The compute & storage collaborator the pipeline reads from and exports to.
//!
//! Asset paths are `/`-separated (`projects/snow/monthly`). Every call is
//! blocking: evaluation happens when a method returns.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::vector::FeatureCollection;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Kinds of stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Folder,
    ImageCollection,
    Image,
    Table,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::ImageCollection => "IMAGE_COLLECTION",
            Self::Image => "IMAGE",
            Self::Table => "TABLE",
        }
    }

    /// Whether assets can be listed and exported under this one.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Folder | Self::ImageCollection)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored asset: full path and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub path: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

impl AssetInfo {
    pub fn new(path: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            path: path.into(),
            asset_type,
        }
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        asset_name(&self.path)
    }

    /// Fail with [`CloudError::AssetType`] unless the asset is one of `allowed`.
    pub fn ensure_type(&self, allowed: &[AssetType]) -> Result<()> {
        if allowed.contains(&self.asset_type) {
            return Ok(());
        }
        Err(CloudError::AssetType {
            path: self.path.clone(),
            expected: allowed
                .iter()
                .map(AssetType::as_str)
                .collect::<Vec<_>>()
                .join(" or "),
            actual: self.asset_type,
        })
    }
}

/// Last segment of an asset path.
pub fn asset_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Join a parent path and a child name.
pub fn join_asset_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

// ---------------------------------------------------------------------------
// Export tasks
// ---------------------------------------------------------------------------

/// State reported by the remote task executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Unsubmitted,
    Ready,
    Submitted,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Anything the executor reports that is not listed above
    Other(String),
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unsubmitted => "UNSUBMITTED",
            Self::Ready => "READY",
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }

    /// Parse an executor state name (case-insensitive).
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "UNSUBMITTED" => Self::Unsubmitted,
            "READY" => Self::Ready,
            "SUBMITTED" => Self::Submitted,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of a task created by [`ComputeService::create_export`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image to be written as a new asset.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub image: RasterFrame<BandSet>,
    /// Full path of the asset to create
    pub asset_path: String,
    /// Task description, usually the image name
    pub description: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Remote compute & storage collaborator.
pub trait ComputeService: Send + Sync {
    /// Kind of the asset at `path`, or [`CloudError::AssetNotFound`].
    fn get_asset(&self, path: &str) -> Result<AssetInfo>;

    /// Direct children of a Folder or ImageCollection, sorted by path.
    fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>>;

    /// Dates of every image in a collection, ascending.
    fn series_dates(&self, path: &str) -> Result<Vec<NaiveDate>>;

    /// Images of a collection whose date is in `dates`.
    fn read_series(&self, path: &str, dates: &BTreeSet<NaiveDate>)
        -> Result<RasterSeries<BandSet>>;

    /// A single image.
    fn read_image(&self, path: &str) -> Result<RasterFrame<BandSet>>;

    /// A vector table (AOI polygons).
    fn read_table(&self, path: &str) -> Result<FeatureCollection>;

    /// Register an export; nothing is written until the task is started.
    fn create_export(&self, request: ExportRequest) -> Result<TaskId>;

    fn start_task(&self, id: &TaskId) -> Result<()>;

    fn task_status(&self, id: &TaskId) -> Result<TaskState>;

    /// Whether `path` exists and has one of the `allowed` types.
    fn check_asset(&self, path: &str, allowed: &[AssetType]) -> Result<AssetInfo> {
        let info = self.get_asset(path)?;
        info.ensure_type(allowed)?;
        Ok(info)
    }
}
