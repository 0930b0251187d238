//! Band math operations
//!
//! Raster algebra on NaN-masked bands: per-cell functions of one or two
//! rasters, mask updates, and pixelwise reductions across several bands.

use ndarray::Array2;
use crate::maybe_rayon::*;
use snowcover_core::raster::Raster;
use snowcover_core::{Error, Result};

/// Binary operations for band math.
///
/// Comparisons yield 1.0 or 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Multiply,
    Min,
    Max,
    Eq,
    Gt,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BandMathOp::Add => a + b,
            BandMathOp::Multiply => a * b,
            BandMathOp::Min => a.min(b),
            BandMathOp::Max => a.max(b),
            BandMathOp::Eq => f64::from(u8::from(a == b)),
            BandMathOp::Gt => f64::from(u8::from(a > b)),
        }
    }
}

/// Pixelwise reducers applied across a stack of bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Max,
    Min,
    Sum,
    Mean,
}

/// Wrap row-major cell values in a raster carrying `template`'s georeference
pub(crate) fn raster_like(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = template.shape();
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Apply a unary function to every unmasked cell.
///
/// Masked (NaN) cells stay masked; `f` may return NaN to mask a cell.
///
/// # Example
/// ```ignore
/// let snow = band_math(&ndsi, |v| if v >= 40.0 { 100.0 } else { 0.0 })?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let view = raster.data();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let val = view[[row, col]];
                if !raster.is_nodata(val) {
                    *out = f(val);
                }
            }
            row_data
        })
        .collect();

    raster_like(raster, data)
}

/// Apply a binary operation between two aligned rasters.
///
/// A cell masked in either input is masked in the output.
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    a.ensure_same_grid(b)?;
    let (rows, cols) = a.shape();
    let (va, vb) = (a.data(), b.data());

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let x = va[[row, col]];
                let y = vb[[row, col]];
                if !a.is_nodata(x) && !b.is_nodata(y) {
                    *out = op.apply(x, y);
                }
            }
            row_data
        })
        .collect();

    raster_like(a, data)
}

/// Mask every cell of `raster` where `mask` is masked or zero.
///
/// Cells already masked in `raster` stay masked.
pub fn update_mask(raster: &Raster<f64>, mask: &Raster<f64>) -> Result<Raster<f64>> {
    raster.ensure_same_grid(mask)?;
    let (rows, cols) = raster.shape();
    let (values, keep) = (raster.data(), mask.data());

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let m = keep[[row, col]];
                if !mask.is_nodata(m) && m != 0.0 {
                    *out = values[[row, col]];
                }
            }
            row_data
        })
        .collect();

    raster_like(raster, data)
}

/// Reduce a stack of aligned bands pixel by pixel.
///
/// Masked inputs are skipped; a cell is masked only when every input is
/// masked there.
pub fn reduce_bands(bands: &[&Raster<f64>], reducer: Reducer) -> Result<Raster<f64>> {
    let first = *bands
        .first()
        .ok_or_else(|| Error::Algorithm("reduce_bands needs at least one band".into()))?;
    for &band in &bands[1..] {
        first.ensure_same_grid(band)?;
    }
    let (rows, cols) = first.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut acc: Option<f64> = None;
                let mut count = 0usize;
                for band in bands {
                    let v = band.data()[[row, col]];
                    if band.is_nodata(v) {
                        continue;
                    }
                    count += 1;
                    acc = Some(match (acc, reducer) {
                        (None, _) => v,
                        (Some(a), Reducer::Max) => a.max(v),
                        (Some(a), Reducer::Min) => a.min(v),
                        (Some(a), Reducer::Sum | Reducer::Mean) => a + v,
                    });
                }
                if let Some(a) = acc {
                    *out = match reducer {
                        Reducer::Mean => a / count as f64,
                        _ => a,
                    };
                }
            }
            row_data
        })
        .collect();

    raster_like(first, data)
}

/// Pixelwise max of two bands, skipping masked inputs
pub fn nan_max(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    reduce_bands(&[a, b], Reducer::Max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcover_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, value);
        r.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_band_math_unary() {
        let input = make_band(50.0);
        let result = band_math(&input, |v| v * 2.0).unwrap();
        assert_eq!(result.get(2, 2).unwrap(), 100.0);
        assert_eq!(result.transform(), input.transform());
    }

    #[test]
    fn test_band_math_preserves_nan() {
        let mut input = make_band(100.0);
        input.set(2, 2, f64::NAN).unwrap();

        let result = band_math(&input, |v| v * 2.0).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_eq!(result.get(0, 0).unwrap(), 200.0);
    }

    #[test]
    fn test_band_math_binary_comparisons() {
        let a = make_band(1200.0);
        let b = make_band(900.0);
        assert_eq!(band_math_binary(&a, &b, BandMathOp::Gt).unwrap().get(1, 1).unwrap(), 1.0);
        assert_eq!(band_math_binary(&a, &b, BandMathOp::Eq).unwrap().get(1, 1).unwrap(), 0.0);

        let mut masked = make_band(900.0);
        masked.set(1, 1, f64::NAN).unwrap();
        let sum = band_math_binary(&a, &masked, BandMathOp::Add).unwrap();
        assert!(sum.get(1, 1).unwrap().is_nan());
        assert_eq!(sum.get(0, 0).unwrap(), 2100.0);
    }

    #[test]
    fn test_band_math_binary_size_mismatch() {
        let a = make_band(1.0);
        let b: Raster<f64> = Raster::filled(4, 5, 1.0);
        assert!(matches!(
            band_math_binary(&a, &b, BandMathOp::Add),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_update_mask() {
        let values = Raster::from_vec(vec![10.0, 20.0, 30.0, 40.0], 2, 2).unwrap();
        let mask = Raster::from_vec(vec![1.0, 0.0, f64::NAN, 100.0], 2, 2).unwrap();
        let out = update_mask(&values, &mask).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 10.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert!(out.get(1, 0).unwrap().is_nan());
        assert_eq!(out.get(1, 1).unwrap(), 40.0);
    }

    #[test]
    fn test_reduce_bands_skip_masked() {
        let a = Raster::from_vec(vec![0.0, f64::NAN, f64::NAN, 50.0], 2, 2).unwrap();
        let b = Raster::from_vec(vec![100.0, 50.0, f64::NAN, 0.0], 2, 2).unwrap();

        let max = reduce_bands(&[&a, &b], Reducer::Max).unwrap();
        assert_eq!(max.get(0, 0).unwrap(), 100.0);
        assert_eq!(max.get(0, 1).unwrap(), 50.0);
        assert!(max.get(1, 0).unwrap().is_nan());
        assert_eq!(max.get(1, 1).unwrap(), 50.0);

        let mean = reduce_bands(&[&a, &b], Reducer::Mean).unwrap();
        assert_eq!(mean.get(0, 0).unwrap(), 50.0);
        assert_eq!(mean.get(0, 1).unwrap(), 50.0);

        assert!(reduce_bands(&[], Reducer::Sum).is_err());
    }
}
