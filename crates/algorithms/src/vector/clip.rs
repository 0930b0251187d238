//! Clipping rasters to an area of interest
//!
//! A cell is kept when its centre lies inside any AOI polygon. Rasters
//! with the placeholder transform are clipped in pixel space, where cell
//! (row, col) has its centre at (col + 0.5, row + 0.5).

use geo::{Contains, Geometry, MultiPolygon, Point, Polygon};
use crate::imagery::band_math::{raster_like, update_mask};
use crate::maybe_rayon::*;
use snowcover_core::raster::Raster;
use snowcover_core::vector::FeatureCollection;
use snowcover_core::Result;

/// Areal parts of an AOI, flattened
#[derive(Debug, Clone)]
pub struct ClipRegion {
    polygons: MultiPolygon<f64>,
}

impl Default for ClipRegion {
    fn default() -> Self {
        Self {
            polygons: MultiPolygon::new(vec![]),
        }
    }
}

impl ClipRegion {
    pub fn from_features(aoi: &FeatureCollection) -> Self {
        let mut polygons = Vec::new();
        for geometry in aoi.geometries() {
            collect_polygons(geometry, &mut polygons);
        }
        Self {
            polygons: MultiPolygon::new(polygons),
        }
    }

    /// Whether the region has no polygon at all
    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.polygons.contains(&Point::new(x, y))
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_polygons(g, out);
            }
        }
        // points and lines have no area
        _ => {}
    }
}

/// 1.0 inside the region and NaN outside, on `template`'s grid
pub fn region_mask(template: &Raster<f64>, region: &ClipRegion) -> Result<Raster<f64>> {
    let (rows, cols) = template.shape();
    let transform = *template.transform();
    let pixel_space = transform.is_unreferenced();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = if pixel_space {
                    (col as f64 + 0.5, row as f64 + 0.5)
                } else {
                    transform.pixel_to_geo(col, row)
                };
                if region.contains_xy(x, y) {
                    *out = 1.0;
                }
            }
            row_data
        })
        .collect();

    raster_like(template, data)
}

/// Mask every cell of `raster` outside the region
pub fn clip_raster(raster: &Raster<f64>, region: &ClipRegion) -> Result<Raster<f64>> {
    let mask = region_mask(raster, region)?;
    update_mask(raster, &mask)
}
