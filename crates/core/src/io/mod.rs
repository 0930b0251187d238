//! Reading and writing single-band GeoTIFF files

mod native;

pub use native::{read_geotiff, write_geotiff};
