//! Band algebra on NaN-masked rasters
//!
//! - Band math: per-cell functions, comparisons and mask updates
//! - Reducers: pixelwise max/min/sum/mean across bands, skipping masked inputs
//! - Remap: exact-value lookup tables

pub(crate) mod band_math;
mod remap;

pub use band_math::{
    band_math, band_math_binary, nan_max, reduce_bands, update_mask, BandMathOp, Reducer,
};
pub use remap::{remap, RemapTable};
