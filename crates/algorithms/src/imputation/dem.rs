//! Elevation-based gap filling
//!
//! A cloud pixel is called snow when it sits higher than the lowest
//! snow-covered cell among its eight neighbors.

use tracing::info;

use crate::imagery::{band_math, band_math_binary, nan_max, update_mask, BandMathOp};
use crate::maybe_rayon::*;
use crate::snow::bands::TacBands;
use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
use snowcover_core::projection::Projection;
use snowcover_core::raster::{Neighborhood, Raster};
use snowcover_core::series::RasterSeries;
use snowcover_core::Result;

/// QA_CR code for pixels filled by this stage
pub const DEM_QA: f64 = 50.0;

/// Impute TAC==0 pixels of one frame from the DEM.
///
/// Only snow (100) is ever written; a cloud pixel at or below its lowest
/// snowy neighbor keeps TAC 0. The DEM is reprojected by the caller and
/// must share the frame's grid.
pub fn impute_tac_spatial_dem(
    bands: &TacBands,
    dem: &Raster<f64>,
    grid: &Projection,
) -> Result<TacBands> {
    let tac = &bands.tac;
    tac.ensure_on_grid(grid)?;
    tac.ensure_same_grid(dem)?;
    tac.ensure_same_grid(&bands.qa_cr)?;

    let is_cloud = band_math(tac, |v| if v == 0.0 { 1.0 } else { 0.0 })?;
    let is_snow = band_math(tac, |v| if v == 100.0 { 1.0 } else { 0.0 })?;
    let dem_cloud = update_mask(dem, &is_cloud)?;
    let dem_snow = update_mask(dem, &is_snow)?;

    let lowest_snow = focal_statistics(
        &dem_snow,
        FocalParams {
            neighborhood: Neighborhood::Square,
            statistic: FocalStatistic::Min,
            skip_masked: false,
        },
    )?;
    let higher = band_math_binary(&dem_cloud, &lowest_snow, BandMathOp::Gt)?;
    let comparison = band_math(&higher, |v| v * 100.0)?;

    let filled_qa = band_math(&comparison, |v| if v > 0.0 { DEM_QA } else { f64::NAN })?;

    Ok(TacBands {
        tac: nan_max(tac, &comparison)?,
        qa_cr: nan_max(&bands.qa_cr, &filled_qa)?,
    })
}

/// Apply [`impute_tac_spatial_dem`] to every frame of a series
pub fn ic_impute_tac_spatial_dem(
    series: RasterSeries<TacBands>,
    dem: &Raster<f64>,
    grid: &Projection,
) -> Result<RasterSeries<TacBands>> {
    info!(frames = series.len(), "DEM imputation");
    let frames = series
        .into_frames()
        .into_par_iter()
        .map(|frame| frame.try_map_bands(|bands| impute_tac_spatial_dem(&bands, dem, grid)))
        .collect::<Result<Vec<_>>>()?;
    RasterSeries::from_frames(frames)
}
