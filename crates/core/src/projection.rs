//! Fixed pipeline grid: projection code plus nominal pixel scale

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Authority code of the MODIS sinusoidal grid used by MOD10A1/MYD10A1
pub const MODIS_SINUSOIDAL: &str = "SR-ORG:6974";

/// Nominal pixel size (metres) of the MODIS daily snow products
pub const MODIS_SCALE: f64 = 463.31271652791656;

/// Projection and scale every band in the pipeline is aligned to.
///
/// Band algebra that assumes pixel alignment (neighbor kernels, pixelwise
/// max/sum across bands) is only valid between rasters on the same
/// `Projection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Authority code, e.g. `SR-ORG:6974` or `EPSG:4326`
    code: String,
    /// Nominal pixel size in projection units
    scale: f64,
}

impl Projection {
    /// Create a projection at a given scale
    pub fn new(code: impl Into<String>, scale: f64) -> Self {
        Self {
            code: code.into(),
            scale,
        }
    }

    /// The MODIS sinusoidal grid at 463.31 m
    pub fn modis_sinusoidal() -> Self {
        Self::new(MODIS_SINUSOIDAL, MODIS_SCALE)
    }

    /// Authority code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Pixel size
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Same projection with a different scale
    pub fn at_scale(&self, scale: f64) -> Self {
        Self::new(self.code.clone(), scale)
    }

    /// Check if two projections describe the same grid
    pub fn is_equivalent(&self, other: &Projection) -> bool {
        self.code.eq_ignore_ascii_case(&other.code)
            && (self.scale - other.scale).abs() <= self.scale.abs() * 1e-9
    }

    /// Fail with [`Error::GridMismatch`] unless `other` is this grid.
    pub fn ensure_matches(&self, other: &Projection) -> Result<()> {
        if self.is_equivalent(other) {
            Ok(())
        } else {
            Err(Error::GridMismatch {
                expected: self.to_string(),
                actual: other.to_string(),
            })
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.code, self.scale)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::modis_sinusoidal()
    }
}
