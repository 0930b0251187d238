//! Binary snow land-cover reclassification of MODIS daily snow products
//!
//! Each frame's `Snow_Albedo_Daily_Tile_Class` and `NDSI_Snow_Cover` bands
//! are folded into one `LandCover_class` band: 0 cloud, 50 land, 100 snow.

use tracing::debug;

use crate::imagery::{band_math, nan_max, remap, RemapTable};
use crate::maybe_rayon::*;
use crate::snow::bands::{FrameBands, LandCover, ModisBands, THRESHOLD_NDSI};
use crate::vector::{clip_raster, ClipRegion};
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::{Error, Result};

/// Default NDSI threshold for calling a pixel snow
pub const DEFAULT_NDSI_THRESHOLD: f64 = 40.0;

/// NDSI threshold, validated to lie in 0..=100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NdsiThreshold(f64);

impl NdsiThreshold {
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&value) {
            return Err(Error::invalid_parameter(
                "threshold_ndsi",
                value,
                "must be between 0 and 100",
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for NdsiThreshold {
    fn default() -> Self {
        Self(DEFAULT_NDSI_THRESHOLD)
    }
}

/// Albedo tile classes: no-decision/cloud codes to 0, land/water codes to 50
pub fn albedo_class_table() -> RemapTable {
    RemapTable::from_lists(
        &[
            101.0, 111.0, 125.0, 137.0, 139.0, 150.0, 151.0, 250.0, 251.0, 252.0, 253.0, 254.0,
        ],
        &[0.0, 0.0, 50.0, 50.0, 50.0, 0.0, 0.0, 0.0, 50.0, 0.0, 50.0, 0.0],
    )
}

/// Thresholded NDSI (0 or 100) to land (50) or snow (100)
pub fn snow_reclass_table() -> RemapTable {
    RemapTable::new(vec![(0.0, 50.0), (100.0, 100.0)])
}

/// Classify one frame.
///
/// A pixel masked in both inputs stays masked; otherwise it is the max of
/// the albedo code and the NDSI code.
pub fn snow_landcover_reclass(
    frame: RasterFrame<ModisBands>,
    threshold: NdsiThreshold,
) -> Result<RasterFrame<LandCover>> {
    let t = threshold.value();
    let frame = frame.try_map_bands(|bands| -> Result<LandCover> {
        bands.ndsi_snow_cover.ensure_same_grid(&bands.albedo_class)?;

        let nodata = remap(&bands.albedo_class, &albedo_class_table())?;
        let snow = band_math(&bands.ndsi_snow_cover, |v| if v >= t { 100.0 } else { 0.0 })?;
        let snow_reclass = remap(&snow, &snow_reclass_table())?;

        Ok(LandCover {
            land_cover: nan_max(&nodata, &snow_reclass)?,
        })
    })?;
    Ok(frame.with_property(THRESHOLD_NDSI, t))
}

/// Clip every frame to the AOI, keep only the MODIS snow bands and classify.
pub fn ic_snow_landcover_reclass(
    series: RasterSeries<BandSet>,
    region: &ClipRegion,
    threshold: NdsiThreshold,
) -> Result<RasterSeries<LandCover>> {
    debug!(frames = series.len(), threshold = threshold.value(), "Reclassifying series");

    let frames = series
        .into_frames()
        .into_par_iter()
        .map(|frame| {
            let frame = frame.try_map_bands(|bands| -> Result<ModisBands> {
                let selected = bands.select(ModisBands::NAMES)?;
                let mut clipped = BandSet::new();
                for (name, band) in selected.iter() {
                    clipped.insert(name, clip_raster(band, region)?);
                }
                ModisBands::from_band_set(clipped)
            })?;
            snow_landcover_reclass(frame, threshold)
        })
        .collect::<Result<Vec<_>>>()?;

    RasterSeries::from_frames(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcover_core::raster::Raster;

    fn modis(ndsi: Vec<f64>, albedo: Vec<f64>) -> RasterFrame<ModisBands> {
        let n = ndsi.len();
        RasterFrame::new(
            0,
            ModisBands {
                ndsi_snow_cover: Raster::from_vec(ndsi, 1, n).unwrap(),
                albedo_class: Raster::from_vec(albedo, 1, n).unwrap(),
            },
        )
    }

    #[test]
    fn test_threshold_validation() {
        assert!(NdsiThreshold::new(0.0).is_ok());
        assert!(NdsiThreshold::new(100.0).is_ok());
        assert!(matches!(
            NdsiThreshold::new(101.0),
            Err(Error::InvalidParameter { name: "threshold_ndsi", .. })
        ));
        assert_eq!(NdsiThreshold::default().value(), 40.0);
    }

    #[test]
    fn test_reclass_cases() {
        // cloud code + low NDSI, land code + high NDSI, unknown code + masked NDSI,
        // cloud code + masked NDSI, masked + low NDSI
        let frame = modis(
            vec![10.0, 80.0, f64::NAN, f64::NAN, 20.0],
            vec![150.0, 125.0, 42.0, 250.0, f64::NAN],
        );
        let out = snow_landcover_reclass(frame, NdsiThreshold::default()).unwrap();
        let lc = &out.bands.land_cover;

        assert_eq!(lc.get(0, 0).unwrap(), 50.0);
        assert_eq!(lc.get(0, 1).unwrap(), 100.0);
        assert!(lc.get(0, 2).unwrap().is_nan());
        assert_eq!(lc.get(0, 3).unwrap(), 0.0);
        assert_eq!(lc.get(0, 4).unwrap(), 50.0);
        assert_eq!(out.properties[THRESHOLD_NDSI], 40.0);
    }

    #[test]
    fn test_landcover_is_total_over_inputs() {
        let albedo = [101.0, 111.0, 125.0, 137.0, 139.0, 150.0, 151.0, 250.0, 251.0, 252.0, 253.0, 254.0];
        for threshold in [0.0, 40.0, 100.0] {
            for ndsi in [0.0, 39.0, 40.0, 41.0, 100.0] {
                let frame = modis(vec![ndsi; albedo.len()], albedo.to_vec());
                let out = snow_landcover_reclass(frame, NdsiThreshold::new(threshold).unwrap()).unwrap();
                for &v in out.bands.land_cover.data().iter() {
                    assert!(v == 0.0 || v == 50.0 || v == 100.0, "unexpected class {}", v);
                }
            }
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let frame = modis(vec![40.0, 39.0], vec![f64::NAN, f64::NAN]);
        let out = snow_landcover_reclass(frame, NdsiThreshold::default()).unwrap();
        assert_eq!(out.bands.land_cover.get(0, 0).unwrap(), 100.0);
        assert_eq!(out.bands.land_cover.get(0, 1).unwrap(), 50.0);
    }
}
