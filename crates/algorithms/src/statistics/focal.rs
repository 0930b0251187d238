//! Focal (kernel) reductions over 3x3 neighbor patterns
//!
//! The center cell itself is never part of the kernel. Masked neighbors
//! and neighbors outside the raster do not contribute.

use crate::imagery::band_math::raster_like;
use crate::maybe_rayon::*;
use snowcover_core::raster::{Neighborhood, Raster};
use snowcover_core::Result;

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStatistic {
    /// Sum of contributing neighbors; 0 when none contribute
    Sum,
    /// Minimum of contributing neighbors; masked when none contribute
    Min,
}

/// Parameters for focal statistics
#[derive(Debug, Clone, Copy)]
pub struct FocalParams {
    pub neighborhood: Neighborhood,
    pub statistic: FocalStatistic,
    /// Mask output cells whose own input value is masked
    pub skip_masked: bool,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Square,
            statistic: FocalStatistic::Sum,
            skip_masked: true,
        }
    }
}

/// Compute a focal statistic at every cell
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let data = raster.data();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                if params.skip_masked && raster.is_nodata(data[[row, col]]) {
                    continue;
                }
                let values = params
                    .neighborhood
                    .values(raster, row, col)
                    .filter(|v| !raster.is_nodata(*v));

                *out = match params.statistic {
                    FocalStatistic::Sum => values.sum(),
                    FocalStatistic::Min => values.fold(f64::NAN, f64::min),
                };
            }

            row_data
        })
        .collect();

    raster_like(raster, output_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Raster<f64> {
        Raster::from_vec(
            vec![
                1.0, 2.0, 3.0, //
                4.0, 5.0, 6.0, //
                7.0, f64::NAN, 9.0,
            ],
            3,
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_cross_sum() {
        let params = FocalParams {
            neighborhood: Neighborhood::Cross,
            ..Default::default()
        };
        let out = focal_statistics(&grid(), params).unwrap();
        // 2 + 4 + 6, the masked south neighbor is skipped
        assert_eq!(out.get(1, 1).unwrap(), 12.0);
        assert_eq!(out.get(0, 0).unwrap(), 6.0);
        assert!(out.get(2, 1).unwrap().is_nan());
    }

    #[test]
    fn test_square_min_keeps_masked_centre() {
        let params = FocalParams {
            neighborhood: Neighborhood::Square,
            statistic: FocalStatistic::Min,
            skip_masked: false,
        };
        let out = focal_statistics(&grid(), params).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), 1.0);
        assert_eq!(out.get(2, 1).unwrap(), 4.0);
    }

    #[test]
    fn test_min_without_contributors_is_masked() {
        let mut raster: Raster<f64> = Raster::filled(3, 3, f64::NAN);
        raster.set(1, 1, 10.0).unwrap();
        let params = FocalParams {
            neighborhood: Neighborhood::Square,
            statistic: FocalStatistic::Min,
            skip_masked: false,
        };
        let out = focal_statistics(&raster, params).unwrap();
        assert!(out.get(1, 1).unwrap().is_nan());
        assert_eq!(out.get(0, 0).unwrap(), 10.0);
    }
}
