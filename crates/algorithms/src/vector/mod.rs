//! Raster clipping to vector areas of interest

mod clip;

pub use clip::{clip_raster, region_mask, ClipRegion};
