//! Terra/Aqua merge: fused classification (TAC) and sensor-agreement QA
//!
//! Frames are joined on exact `time_start`. A date seen by only one sensor
//! gets a fully masked band for the other, so every date appears once.

use std::collections::BTreeMap;

use tracing::debug;

use crate::imagery::{band_math, nan_max, reduce_bands, remap, Reducer, RemapTable};
use crate::maybe_rayon::*;
use crate::snow::bands::{LandCover, TacBands};
use snowcover_core::raster::Raster;
use snowcover_core::series::{RasterFrame, RasterSeries};
use snowcover_core::Result;

/// `LandCover_T * 10 + LandCover_A` to QA_CR: 10 Terra, 11 Aqua, 12 both
pub fn qa_sum_table() -> RemapTable {
    RemapTable::from_lists(
        &[0.0, 50.0, 100.0, 500.0, 550.0, 600.0, 1000.0, 1050.0, 1100.0],
        &[12.0, 11.0, 11.0, 10.0, 12.0, 11.0, 10.0, 10.0, 12.0],
    )
}

/// TAC and QA_CR from one pair of sensor classifications
pub fn calculate_tac_qa(terra: &Raster<f64>, aqua: &Raster<f64>) -> Result<TacBands> {
    terra.ensure_same_grid(aqua)?;

    let tac = nan_max(terra, aqua)?;
    let terra_weighted = band_math(terra, |v| v * 10.0)?;
    let qa_sum = reduce_bands(&[&terra_weighted, aqua], Reducer::Sum)?;
    let qa_cr = remap(&qa_sum, &qa_sum_table())?;

    Ok(TacBands { tac, qa_cr })
}

/// Join the two sensor series by timestamp and fuse them
pub fn merge(
    terra: RasterSeries<LandCover>,
    aqua: RasterSeries<LandCover>,
) -> Result<RasterSeries<TacBands>> {
    type Pair = (Option<RasterFrame<LandCover>>, Option<RasterFrame<LandCover>>);
    let mut joined: BTreeMap<i64, Pair> = BTreeMap::new();
    for frame in terra {
        let t = frame.time_start;
        joined.entry(t).or_default().0 = Some(frame);
    }
    for frame in aqua {
        let t = frame.time_start;
        joined.entry(t).or_default().1 = Some(frame);
    }

    let terra_only = joined.values().filter(|(_, a)| a.is_none()).count();
    let aqua_only = joined.values().filter(|(t, _)| t.is_none()).count();
    debug!(dates = joined.len(), terra_only, aqua_only, "Merging Terra and Aqua");

    let frames = joined
        .into_values()
        .collect::<Vec<Pair>>()
        .into_par_iter()
        .filter_map(|pair| match pair {
            (Some(t), Some(a)) => Some(merge_frames(t, a.bands.land_cover)),
            (Some(t), None) => {
                let missing = t.bands.land_cover.like(f64::NAN);
                Some(merge_frames(t, missing))
            }
            (None, Some(a)) => {
                let missing = a.bands.land_cover.like(f64::NAN);
                Some(
                    a.try_map_bands(|bands| calculate_tac_qa(&missing, &bands.land_cover)),
                )
            }
            (None, None) => None,
        })
        .collect::<Result<Vec<_>>>()?;

    RasterSeries::from_frames(frames)
}

fn merge_frames(terra: RasterFrame<LandCover>, aqua: Raster<f64>) -> Result<RasterFrame<TacBands>> {
    terra.try_map_bands(|bands| calculate_tac_qa(&bands.land_cover, &aqua))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(entries: &[(i64, f64)]) -> RasterSeries<LandCover> {
        let frames = entries
            .iter()
            .map(|&(t, v)| {
                RasterFrame::new(
                    t,
                    LandCover {
                        land_cover: Raster::filled(2, 2, v),
                    },
                )
            })
            .collect();
        RasterSeries::from_frames(frames).unwrap()
    }

    fn qa_for(t: f64, a: f64) -> f64 {
        let out = calculate_tac_qa(&Raster::filled(1, 1, t), &Raster::filled(1, 1, a)).unwrap();
        out.qa_cr.get(0, 0).unwrap()
    }

    #[test]
    fn test_qa_table() {
        assert_eq!(qa_for(0.0, 0.0), 12.0);
        assert_eq!(qa_for(0.0, 50.0), 11.0);
        assert_eq!(qa_for(50.0, 0.0), 10.0);
        assert_eq!(qa_for(50.0, 50.0), 12.0);
        assert_eq!(qa_for(50.0, 100.0), 11.0);
        assert_eq!(qa_for(100.0, 0.0), 10.0);
        assert_eq!(qa_for(100.0, 50.0), 10.0);
        assert_eq!(qa_for(100.0, 100.0), 12.0);
    }

    #[test]
    fn test_matching_dates() {
        let merged = merge(series(&[(0, 0.0)]), series(&[(0, 50.0)])).unwrap();
        assert_eq!(merged.len(), 1);
        let frame = &merged.frames()[0];
        assert_eq!(frame.bands.tac.get(0, 0).unwrap(), 50.0);
        assert_eq!(frame.bands.qa_cr.get(0, 0).unwrap(), 11.0);
    }

    #[test]
    fn test_single_sensor_dates_kept_once() {
        let day = 86_400_000;
        let merged = merge(
            series(&[(0, 100.0), (day, 50.0)]),
            series(&[(day, 100.0), (2 * day, 50.0)]),
        )
        .unwrap();
        assert_eq!(merged.len(), 3);

        let terra_only = merged.get(0).unwrap();
        assert_eq!(terra_only.bands.tac.get(1, 1).unwrap(), 100.0);
        assert_eq!(terra_only.bands.qa_cr.get(1, 1).unwrap(), 10.0);

        let both = merged.get(day).unwrap();
        assert_eq!(both.bands.tac.get(0, 0).unwrap(), 100.0);
        assert_eq!(both.bands.qa_cr.get(0, 0).unwrap(), 11.0);

        let aqua_only = merged.get(2 * day).unwrap();
        assert_eq!(aqua_only.bands.tac.get(0, 0).unwrap(), 50.0);
        assert_eq!(aqua_only.bands.qa_cr.get(0, 0).unwrap(), 11.0);
    }

    #[test]
    fn test_masked_in_both_stays_masked() {
        let out = calculate_tac_qa(&Raster::filled(1, 1, f64::NAN), &Raster::filled(1, 1, f64::NAN))
            .unwrap();
        assert!(out.tac.get(0, 0).unwrap().is_nan());
        assert!(out.qa_cr.get(0, 0).unwrap().is_nan());
    }
}
