//! 3x3 neighbor kernels used by the gap-filling stages

use super::{Raster, RasterElement};

/// Neighbor pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// The four edge-adjacent neighbors (N, S, E, W)
    Cross,
    /// All eight neighbors of the 3x3 window
    Square,
}

impl Neighborhood {
    /// Relative (row, col) offsets, excluding the center cell
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        const CROSS: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
        const SQUARE: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Neighborhood::Cross => &CROSS,
            Neighborhood::Square => &SQUARE,
        }
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.offsets().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Values of the in-bounds neighbors of (row, col).
    ///
    /// Cells outside the raster are skipped; masked values are returned
    /// as-is and left to the caller.
    pub fn values<'a, T: RasterElement>(
        &'a self,
        raster: &'a Raster<T>,
        row: usize,
        col: usize,
    ) -> impl Iterator<Item = T> + 'a {
        let (rows, cols) = raster.shape();
        let data = raster.data();
        self.offsets().iter().filter_map(move |&(dr, dc)| {
            let r = row as isize + dr;
            let c = col as isize + dc;
            if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
                None
            } else {
                Some(data[[r as usize, c as usize]])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        assert_eq!(Neighborhood::Cross.len(), 4);
        assert_eq!(Neighborhood::Square.len(), 8);
        assert!(!Neighborhood::Square.offsets().contains(&(0, 0)));
    }

    #[test]
    fn test_values_skip_out_of_bounds() {
        let raster = Raster::from_vec((1..=9).map(f64::from).collect(), 3, 3).unwrap();

        let corner: Vec<f64> = Neighborhood::Cross.values(&raster, 0, 0).collect();
        assert_eq!(corner, vec![2.0, 4.0]);

        let centre: f64 = Neighborhood::Square.values(&raster, 1, 1).sum();
        assert_eq!(centre, 45.0 - 5.0);
    }
}
