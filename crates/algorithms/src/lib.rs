//! # Snowcover Algorithms
//!
//! Band algebra and pipeline stages for MODIS snow cover.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Band math, reducers and remap tables on NaN-masked rasters
//! - **statistics**: Focal (kernel) sum and min
//! - **vector**: AOI clipping
//! - **snow**: Binary reclassification, Terra/Aqua merge, cloud/snow split
//! - **imputation**: Temporal, spatial-4 and DEM gap filling
//! - **monthly**: Month completeness and monthly mean composites
//! - **pipeline**: The full per-day chain

pub mod imagery;
pub mod imputation;
pub(crate) mod maybe_rayon;
pub mod monthly;
pub mod pipeline;
pub mod snow;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        band_math, band_math_binary, nan_max, reduce_bands, remap, update_mask, BandMathOp,
        Reducer, RemapTable,
    };
    pub use crate::imputation::{
        ic_impute_tac_spatial4, ic_impute_tac_spatial_dem, ic_impute_tac_temporal,
        IncompleteWindow,
    };
    pub use crate::monthly::{monthly_mean, months_are_complete};
    pub use crate::pipeline::{tac_reclass_and_impute, PipelineParams};
    pub use crate::snow::{
        CloudSnowBands, FrameBands, LandCover, ModisBands, MonthlyBands, NdsiThreshold, TacBands,
    };
    pub use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
    pub use crate::vector::{clip_raster, ClipRegion};
    pub use snowcover_core::prelude::*;
}
