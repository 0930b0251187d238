//! Main Raster type

use crate::error::{Error, Result};
use crate::projection::Projection;
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid together with the
/// affine transform and the [`Projection`] it is aligned to. Pipeline bands
/// are `Raster<f64>` where NaN marks a masked (undefined) pixel.
///
/// # Example
///
/// ```ignore
/// use snowcover_core::Raster;
///
/// let mut tac: Raster<f64> = Raster::filled(3, 3, 50.0);
/// tac.set(1, 1, 0.0)?;
/// assert_eq!(tac.get(1, 1)?, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Grid the raster is aligned to, `None` for unreferenced arrays
    projection: Option<Projection>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            projection: None,
            nodata: None,
        }
    }

    /// Create a zero raster with the same georeference but a different cell type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            projection: self.projection.clone(),
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            projection: self.projection.clone(),
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.data.nrows(),
                cols: self.data.ncols(),
            }),
        }
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Grid this raster is aligned to
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Set the grid this raster is aligned to
    pub fn set_projection(&mut self, projection: Option<Projection>) {
        self.projection = projection;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Geographic coordinates of a pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    // Grid alignment

    /// Fail unless `other` has the same shape and grid as `self`.
    ///
    /// Rasters without a projection are treated as already aligned;
    /// only shapes are compared for them.
    pub fn ensure_same_grid<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        match (self.projection(), other.projection()) {
            (Some(a), Some(b)) => a.ensure_matches(b),
            _ => Ok(()),
        }
    }

    /// Fail unless this raster is unreferenced or on `grid`
    pub fn ensure_on_grid(&self, grid: &Projection) -> Result<()> {
        match self.projection() {
            Some(p) => grid.ensure_matches(p),
            None => Ok(()),
        }
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.is_none_or(|m| value < m) {
                min = Some(value);
            }
            if max.is_none_or(|m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f64> = Raster::new(10, 20);
        assert_eq!(raster.rows(), 10);
        assert_eq!(raster.cols(), 20);
        assert_eq!(raster.shape(), (10, 20));
        assert!(raster.projection().is_none());
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(5, 5);
        raster.set(2, 3, 100.0).unwrap();
        assert_eq!(raster.get(2, 3).unwrap(), 100.0);
        assert!(raster.get(5, 0).is_err());
        assert!(raster.set(0, 5, 1.0).is_err());
    }

    #[test]
    fn test_statistics_skip_masked() {
        let raster = Raster::from_vec(vec![0.0, 50.0, f64::NAN, 100.0], 2, 2).unwrap();
        let stats = raster.statistics();
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(100.0));
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.nodata_count, 1);
        assert!((stats.mean.unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_alignment() {
        let mut a: Raster<f64> = Raster::filled(3, 3, 0.0);
        let mut b: Raster<f64> = Raster::filled(3, 3, 0.0);
        assert!(a.ensure_same_grid(&b).is_ok());

        a.set_projection(Some(Projection::modis_sinusoidal()));
        b.set_projection(Some(Projection::modis_sinusoidal().at_scale(1000.0)));
        assert!(matches!(a.ensure_same_grid(&b), Err(Error::GridMismatch { .. })));

        let c: Raster<f64> = Raster::filled(2, 3, 0.0);
        assert!(matches!(a.ensure_same_grid(&c), Err(Error::SizeMismatch { .. })));
        assert!(c.ensure_on_grid(&Projection::modis_sinusoidal()).is_ok());
    }
}
