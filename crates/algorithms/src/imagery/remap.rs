//! Exact-value remapping
//!
//! A `RemapTable` is an ordered association list of input value to output
//! value plus a default for unmatched cells. The pipeline's recode tables
//! (albedo classes, QA sums, neighbor-sum decoding) are all expressed with it.

use crate::imagery::band_math::band_math;
use snowcover_core::raster::Raster;
use snowcover_core::Result;

/// Ordered exact-match lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct RemapTable {
    entries: Vec<(f64, f64)>,
    /// Value for unmatched cells; NaN masks them
    default: f64,
}

impl RemapTable {
    /// Table whose unmatched inputs become masked
    pub fn new(entries: Vec<(f64, f64)>) -> Self {
        Self {
            entries,
            default: f64::NAN,
        }
    }

    /// Build from parallel `from`/`to` lists, truncated to the shorter one
    pub fn from_lists(from: &[f64], to: &[f64]) -> Self {
        Self::new(from.iter().copied().zip(to.iter().copied()).collect())
    }

    /// Map unmatched inputs to `default` instead of masking them
    pub fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    /// Output for one value: first matching entry wins
    pub fn lookup(&self, value: f64) -> f64 {
        self.entries
            .iter()
            .find(|(from, _)| *from == value)
            .map_or(self.default, |&(_, to)| to)
    }

    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }
}

/// Remap every unmasked cell through `table`; masked cells stay masked
pub fn remap(raster: &Raster<f64>, table: &RemapTable) -> Result<Raster<f64>> {
    band_math(raster, |v| table.lookup(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_first_match_and_default() {
        let table = RemapTable::new(vec![(0.0, 50.0), (100.0, 100.0), (0.0, 1.0)]);
        assert_eq!(table.lookup(0.0), 50.0);
        assert_eq!(table.lookup(100.0), 100.0);
        assert!(table.lookup(7.0).is_nan());
        assert_eq!(table.clone().with_default(-1.0).lookup(7.0), -1.0);
    }

    #[test]
    fn test_remap_raster() {
        let table = RemapTable::from_lists(&[0.0, 50.0, 100.0], &[0.0, 7.0, 9.0]);
        let input = Raster::from_vec(vec![0.0, 50.0, 100.0, 25.0, f64::NAN, 50.0], 2, 3).unwrap();
        let out = remap(&input, &table).unwrap();
        assert_eq!(out.get(0, 1).unwrap(), 7.0);
        assert_eq!(out.get(0, 2).unwrap(), 9.0);
        assert!(out.get(1, 0).unwrap().is_nan());
        assert!(out.get(1, 1).unwrap().is_nan());
    }
}
