//! # Snowcover Core
//!
//! Core types for the MODIS snow-cover pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type, NaN-masked for floating point cells
//! - `GeoTransform` and `Projection`: the fixed grid every band is aligned to
//! - `RasterFrame` / `RasterSeries`: dated frames and time-ordered collections of them
//! - `BandSet`: name-keyed band bag used at storage boundaries
//! - `calendar`: dates, year-months and buffer windows
//! - AOI vector types and native GeoTIFF I/O

pub mod calendar;
pub mod error;
pub mod io;
pub mod projection;
pub mod raster;
pub mod series;
pub mod vector;

pub use calendar::{MonthRange, YearMonth};
pub use error::{Error, Result};
pub use projection::Projection;
pub use raster::{GeoTransform, Raster, RasterElement};
pub use series::{BandSet, RasterFrame, RasterSeries};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calendar::{MonthRange, YearMonth};
    pub use crate::error::{Error, Result};
    pub use crate::projection::Projection;
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::series::{BandSet, RasterFrame, RasterSeries};
}
