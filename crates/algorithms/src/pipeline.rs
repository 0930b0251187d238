//! The per-day pipeline: reclassify, merge, impute, split

use tracing::info;

use crate::imputation::{
    ic_impute_tac_spatial4, ic_impute_tac_spatial_dem, ic_impute_tac_temporal, IncompleteWindow,
};
use crate::maybe_rayon::*;
use crate::snow::{ic_snow_landcover_reclass, merge, split_cloud_snow_bands, CloudSnowBands, NdsiThreshold};
use crate::vector::ClipRegion;
use snowcover_core::projection::Projection;
use snowcover_core::raster::Raster;
use snowcover_core::series::{BandSet, RasterSeries};
use snowcover_core::Result;

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub threshold: NdsiThreshold,
    /// Grid every raster must be on
    pub grid: Projection,
    pub incomplete_window: IncompleteWindow,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            threshold: NdsiThreshold::default(),
            grid: Projection::modis_sinusoidal(),
            incomplete_window: IncompleteWindow::Drop,
        }
    }
}

/// Turn raw Terra and Aqua series into daily cloud/snow indicator frames.
///
/// `terra` and `aqua` must carry the MODIS snow bands; `dem` must be on the
/// same grid as the imagery.
pub fn tac_reclass_and_impute(
    terra: RasterSeries<BandSet>,
    aqua: RasterSeries<BandSet>,
    region: &ClipRegion,
    dem: &Raster<f64>,
    params: &PipelineParams,
) -> Result<RasterSeries<CloudSnowBands>> {
    info!(terra = terra.len(), aqua = aqua.len(), "Reclassifying snow land cover");
    let terra = ic_snow_landcover_reclass(terra, region, params.threshold)?;
    let aqua = ic_snow_landcover_reclass(aqua, region, params.threshold)?;

    let merged = merge(terra, aqua)?;
    info!(dates = merged.len(), "Merged Terra and Aqua");

    let temporal = ic_impute_tac_temporal(&merged, params.incomplete_window)?;
    let spatial = ic_impute_tac_spatial4(temporal, &params.grid)?;
    let imputed = ic_impute_tac_spatial_dem(spatial, dem, &params.grid)?;

    let frames = imputed
        .into_frames()
        .into_par_iter()
        .map(split_cloud_snow_bands)
        .collect::<Result<Vec<_>>>()?;
    info!(dates = frames.len(), "Cloud/snow series ready");
    RasterSeries::from_frames(frames)
}
