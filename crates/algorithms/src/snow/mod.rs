//! Snow land-cover stages: per-sensor classification, sensor merge and
//! cloud/snow band split

pub mod bands;
mod classify;
mod merge;
mod split;

pub use bands::{
    CloudSnowBands, FrameBands, LandCover, ModisBands, MonthlyBands, TacBands, typed_series,
    untyped_frame,
};
pub use classify::{
    albedo_class_table, ic_snow_landcover_reclass, snow_landcover_reclass, snow_reclass_table,
    NdsiThreshold, DEFAULT_NDSI_THRESHOLD,
};
pub use merge::{calculate_tac_qa, merge, qa_sum_table};
pub use split::split_cloud_snow_bands;
