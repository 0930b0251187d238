//! Single-band GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Bands are stored as 64-bit float so masked cells survive as NaN.
//! Only the pixel-scale and tiepoint tags are read back; the grid's
//! projection is carried by the asset metadata, not the file.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::Gray64Float;
use tiff::tags::Tag;

/// Read the first band of a GeoTIFF file
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

fn tiff_err(context: &'static str) -> impl Fn(tiff::TiffError) -> Error {
    move |e| Error::Other(format!("{}: {}", context, e))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?
    {
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ));
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    // The decoder files 33550/33922 under their named variants, never `Tag::Unknown`
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    Some(GeoTransform::new(
        tiepoint[3] - tiepoint[0] * scale[0],
        tiepoint[4] + tiepoint[1] * scale[1],
        scale[0],
        -scale[1],
    ))
}

/// Write a raster as a single-band 64-bit float GeoTIFF
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: &mut W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    // Version 1.1.0, 2 keys: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
        .map_err(tiff_err("Cannot write geokey tag"))?;

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_cells_survive_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TAC.tif");

        let mut raster = Raster::from_vec(vec![0.0, 50.0, f64::NAN, 100.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(-1000.0, 2000.0, 463.3, -463.3));
        write_geotiff(&raster, &path).unwrap();

        let back: Raster<f64> = read_geotiff(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
        assert_eq!(back.get(0, 1).unwrap(), 50.0);
        assert!(back.get(1, 0).unwrap().is_nan());
        assert!((back.transform().origin_x + 1000.0).abs() < 1e-9);
        assert!((back.transform().pixel_height + 463.3).abs() < 1e-9);
    }
}
