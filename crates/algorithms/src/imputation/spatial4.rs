//! Gap filling from the four edge-adjacent neighbors
//!
//! TAC is recoded to collision-free weights (cloud 0, land 7, snow 9) and
//! summed over the N/S/E/W kernel; each sum identifies the mix of
//! neighbor classes, and a decode table turns it back into a class.

use tracing::info;

use crate::imagery::{band_math, nan_max, remap, update_mask, RemapTable};
use crate::maybe_rayon::*;
use crate::snow::bands::TacBands;
use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
use snowcover_core::projection::Projection;
use snowcover_core::raster::Neighborhood;
use snowcover_core::series::RasterSeries;
use snowcover_core::Result;

/// QA_CR code for pixels filled by this stage
pub const SPATIAL4_QA: f64 = 40.0;

/// TAC class to neighbor-sum weight
pub fn neighbor_weight_table() -> RemapTable {
    RemapTable::new(vec![(0.0, 0.0), (50.0, 7.0), (100.0, 9.0)])
}

/// Neighbor-sum to imputed class; sums not listed stay masked
pub fn neighbor_sum_decode_table() -> RemapTable {
    RemapTable::from_lists(
        &[
            0.0, 7.0, 9.0, 14.0, 16.0, 18.0, 21.0, 23.0, 25.0, 27.0, 28.0, 30.0, 32.0, 34.0, 36.0,
        ],
        &[
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0, 0.0, 0.0, 100.0, 50.0, 50.0, 0.0, 100.0, 100.0,
        ],
    )
}

/// Impute TAC==0 pixels of one frame from their cross neighbors.
///
/// Pixels with TAC > 0 are never changed. Filled pixels get
/// QA_CR = max(QA_CR, 40).
pub fn impute_tac_spatial4(bands: &TacBands, grid: &Projection) -> Result<TacBands> {
    let tac = &bands.tac;
    tac.ensure_on_grid(grid)?;
    tac.ensure_same_grid(&bands.qa_cr)?;

    let weights = remap(tac, &neighbor_weight_table())?;
    let sums = focal_statistics(
        &weights,
        FocalParams {
            neighborhood: Neighborhood::Cross,
            statistic: FocalStatistic::Sum,
            skip_masked: true,
        },
    )?;
    let nodata = band_math(tac, |v| if v == 0.0 { 1.0 } else { 0.0 })?;
    let decoded = remap(&update_mask(&sums, &nodata)?, &neighbor_sum_decode_table())?;

    let filled_qa = band_math(&decoded, |v| if v > 0.0 { SPATIAL4_QA } else { f64::NAN })?;

    Ok(TacBands {
        tac: nan_max(tac, &decoded)?,
        qa_cr: nan_max(&bands.qa_cr, &filled_qa)?,
    })
}

/// Apply [`impute_tac_spatial4`] to every frame of a series
pub fn ic_impute_tac_spatial4(
    series: RasterSeries<TacBands>,
    grid: &Projection,
) -> Result<RasterSeries<TacBands>> {
    info!(frames = series.len(), "Spatial-4 imputation");
    let frames = series
        .into_frames()
        .into_par_iter()
        .map(|frame| frame.try_map_bands(|bands| impute_tac_spatial4(&bands, grid)))
        .collect::<Result<Vec<_>>>()?;
    RasterSeries::from_frames(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcover_core::raster::Raster;

    fn impute_centre(n: f64, w: f64, e: f64, s: f64) -> (f64, f64) {
        let tac = Raster::from_vec(
            vec![
                f64::NAN, n, f64::NAN, //
                w, 0.0, e, //
                f64::NAN, s, f64::NAN,
            ],
            3,
            3,
        )
        .unwrap();
        let bands = TacBands {
            qa_cr: Raster::filled(3, 3, 12.0),
            tac,
        };
        let out = impute_tac_spatial4(&bands, &Projection::modis_sinusoidal()).unwrap();
        (out.tac.get(1, 1).unwrap(), out.qa_cr.get(1, 1).unwrap())
    }

    #[test]
    fn test_land_majority() {
        // 7 + 7 + 7 = 21
        assert_eq!(impute_centre(50.0, 50.0, 50.0, 0.0), (50.0, 40.0));
    }

    #[test]
    fn test_snow_majority() {
        // 9 + 9 + 9 + 7 = 34
        assert_eq!(impute_centre(100.0, 100.0, 100.0, 50.0), (100.0, 40.0));
        // 9 * 4 = 36
        assert_eq!(impute_centre(100.0, 100.0, 100.0, 100.0), (100.0, 40.0));
        // 9 + 9 + 9 = 27
        assert_eq!(impute_centre(100.0, 100.0, 100.0, 0.0), (100.0, 40.0));
    }

    #[test]
    fn test_mixed_stays_cloud() {
        // 7 + 9 = 16
        assert_eq!(impute_centre(50.0, 100.0, 0.0, 0.0), (0.0, 12.0));
        // 7 + 7 + 9 + 9 = 32
        assert_eq!(impute_centre(50.0, 50.0, 100.0, 100.0), (0.0, 12.0));
    }

    #[test]
    fn test_unlisted_sum_stays_cloud() {
        // 7 + 7 + 7 + 9 = 30 -> land; 7 * 4 = 28 -> land; 9 + 9 + 7 = 25 -> cloud
        assert_eq!(impute_centre(50.0, 50.0, 50.0, 100.0), (50.0, 40.0));
        assert_eq!(impute_centre(50.0, 50.0, 50.0, 50.0), (50.0, 40.0));
        assert_eq!(impute_centre(100.0, 100.0, 50.0, 0.0), (0.0, 12.0));
    }

    #[test]
    fn test_known_pixels_unchanged() {
        let tac = Raster::from_vec(vec![50.0, 100.0, 0.0, 100.0], 2, 2).unwrap();
        let bands = TacBands {
            qa_cr: Raster::filled(2, 2, 11.0),
            tac: tac.clone(),
        };
        let out = impute_tac_spatial4(&bands, &Projection::modis_sinusoidal()).unwrap();
        for (r, c) in [(0, 0), (0, 1), (1, 1)] {
            assert_eq!(out.tac.get(r, c).unwrap(), tac.get(r, c).unwrap());
            assert_eq!(out.qa_cr.get(r, c).unwrap(), 11.0);
        }
    }

    #[test]
    fn test_off_grid_rejected() {
        let mut tac: Raster<f64> = Raster::filled(2, 2, 0.0);
        tac.set_projection(Some(Projection::new("EPSG:4326", 0.01)));
        let bands = TacBands {
            qa_cr: Raster::filled(2, 2, 12.0),
            tac,
        };
        assert!(impute_tac_spatial4(&bands, &Projection::modis_sinusoidal()).is_err());
    }
}
