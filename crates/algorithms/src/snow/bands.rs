//! Typed band records for each pipeline stage
//!
//! Storage hands out name-keyed [`BandSet`]s; stages work on these structs.
//! Converting at the boundary is where a missing band is reported.

use snowcover_core::raster::Raster;
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::Result;

pub const NDSI_SNOW_COVER: &str = "NDSI_Snow_Cover";
pub const SNOW_ALBEDO_CLASS: &str = "Snow_Albedo_Daily_Tile_Class";
pub const LANDCOVER_CLASS: &str = "LandCover_class";
pub const LANDCOVER_T: &str = "LandCover_T";
pub const LANDCOVER_A: &str = "LandCover_A";
pub const TAC: &str = "TAC";
pub const QA_CR: &str = "QA_CR";
pub const CLOUD_TAC: &str = "Cloud_TAC";
pub const SNOW_TAC: &str = "Snow_TAC";

/// Frame property recording the NDSI threshold used by the reclassifier
pub const THRESHOLD_NDSI: &str = "Threshold_NDSI";

/// Conversion between a typed band record and a [`BandSet`]
pub trait FrameBands: Sized {
    /// Band names this record reads and writes
    const NAMES: &'static [&'static str];

    fn from_band_set(bands: BandSet) -> Result<Self>;

    fn into_band_set(self) -> BandSet;
}

/// Raw MODIS daily snow bands used by the reclassifier
#[derive(Debug, Clone)]
pub struct ModisBands {
    pub ndsi_snow_cover: Raster<f64>,
    pub albedo_class: Raster<f64>,
}

impl FrameBands for ModisBands {
    const NAMES: &'static [&'static str] = &[NDSI_SNOW_COVER, SNOW_ALBEDO_CLASS];

    fn from_band_set(mut bands: BandSet) -> Result<Self> {
        Ok(Self {
            ndsi_snow_cover: bands.take(NDSI_SNOW_COVER)?,
            albedo_class: bands.take(SNOW_ALBEDO_CLASS)?,
        })
    }

    fn into_band_set(self) -> BandSet {
        BandSet::new()
            .with(NDSI_SNOW_COVER, self.ndsi_snow_cover)
            .with(SNOW_ALBEDO_CLASS, self.albedo_class)
    }
}

/// Per-sensor classification: 0 cloud, 50 land, 100 snow
#[derive(Debug, Clone)]
pub struct LandCover {
    pub land_cover: Raster<f64>,
}

impl FrameBands for LandCover {
    const NAMES: &'static [&'static str] = &[LANDCOVER_CLASS];

    fn from_band_set(mut bands: BandSet) -> Result<Self> {
        Ok(Self {
            land_cover: bands.take(LANDCOVER_CLASS)?,
        })
    }

    fn into_band_set(self) -> BandSet {
        BandSet::new().with(LANDCOVER_CLASS, self.land_cover)
    }
}

/// Fused Terra-Aqua classification and its quality code
#[derive(Debug, Clone)]
pub struct TacBands {
    pub tac: Raster<f64>,
    pub qa_cr: Raster<f64>,
}

impl FrameBands for TacBands {
    const NAMES: &'static [&'static str] = &[TAC, QA_CR];

    fn from_band_set(mut bands: BandSet) -> Result<Self> {
        let tac = bands.take(TAC)?;
        let qa_cr = bands.take(QA_CR)?;
        tac.ensure_same_grid(&qa_cr)?;
        Ok(Self { tac, qa_cr })
    }

    fn into_band_set(self) -> BandSet {
        BandSet::new().with(TAC, self.tac).with(QA_CR, self.qa_cr)
    }
}

/// Cloud and snow indicator bands (0/100) plus the quality code
#[derive(Debug, Clone)]
pub struct CloudSnowBands {
    pub cloud_tac: Raster<f64>,
    pub snow_tac: Raster<f64>,
    pub qa_cr: Raster<f64>,
}

impl FrameBands for CloudSnowBands {
    const NAMES: &'static [&'static str] = &[CLOUD_TAC, SNOW_TAC, QA_CR];

    fn from_band_set(mut bands: BandSet) -> Result<Self> {
        Ok(Self {
            cloud_tac: bands.take(CLOUD_TAC)?,
            snow_tac: bands.take(SNOW_TAC)?,
            qa_cr: bands.take(QA_CR)?,
        })
    }

    fn into_band_set(self) -> BandSet {
        BandSet::new()
            .with(CLOUD_TAC, self.cloud_tac)
            .with(SNOW_TAC, self.snow_tac)
            .with(QA_CR, self.qa_cr)
    }
}

/// Monthly mean cover percentages (0.0 to 100.0)
#[derive(Debug, Clone)]
pub struct MonthlyBands {
    pub snow_tac: Raster<f64>,
    pub cloud_tac: Raster<f64>,
}

impl FrameBands for MonthlyBands {
    const NAMES: &'static [&'static str] = &[SNOW_TAC, CLOUD_TAC];

    fn from_band_set(mut bands: BandSet) -> Result<Self> {
        Ok(Self {
            snow_tac: bands.take(SNOW_TAC)?,
            cloud_tac: bands.take(CLOUD_TAC)?,
        })
    }

    fn into_band_set(self) -> BandSet {
        BandSet::new()
            .with(SNOW_TAC, self.snow_tac)
            .with(CLOUD_TAC, self.cloud_tac)
    }
}

/// Convert every frame of a name-keyed series to a typed record
pub fn typed_series<B: FrameBands>(series: RasterSeries<BandSet>) -> Result<RasterSeries<B>> {
    let frames = series
        .into_frames()
        .into_iter()
        .map(|frame| frame.try_map_bands(B::from_band_set))
        .collect::<Result<Vec<_>>>()?;
    RasterSeries::from_frames(frames)
}

/// Convert a typed frame back to name-keyed bands
pub fn untyped_frame<B: FrameBands>(frame: RasterFrame<B>) -> RasterFrame<BandSet> {
    frame.map_bands(B::into_band_set)
}
