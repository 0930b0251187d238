//! # Snowcover Cloud
//!
//! The storage side of the snow-cover pipeline: a compute & storage
//! collaborator trait, asset stores that implement it, export task
//! tracking and the monthly export planner.
//!
//! ## Stores
//!
//! - [`LocalStore`]: assets as directories, JSON metadata and GeoTIFF bands
//! - [`InMemoryStore`]: the same contract held in memory

pub mod error;
pub mod exports;
pub mod local;
pub mod memory;
pub mod monthly_export;
pub mod service;
mod tasks;

pub use error::{CloudError, Result};
pub use exports::{track_exports, ExportTask, TaskStatus, DEFAULT_POLL_INTERVAL};
pub use local::LocalStore;
pub use memory::InMemoryStore;
pub use monthly_export::{
    monthly_export_proc, ExcludedMonth, ExclusionReason, ExportMode, MonthlyExportRequest,
    MonthlyExportResult,
};
pub use service::{AssetInfo, AssetType, ComputeService, ExportRequest, TaskId, TaskState};
