//! End-to-end runs of the per-day pipeline on small synthetic MODIS tiles.
//!
//! Tiles are 4x4 cells on the MODIS sinusoidal grid; the AOI covers the
//! whole tile unless a test says otherwise.

use snowcover_algorithms::imputation::IncompleteWindow;
use snowcover_algorithms::monthly::monthly_mean;
use snowcover_algorithms::pipeline::{tac_reclass_and_impute, PipelineParams};
use snowcover_algorithms::snow::bands::{NDSI_SNOW_COVER, SNOW_ALBEDO_CLASS};
use snowcover_algorithms::vector::ClipRegion;
use snowcover_core::calendar::{parse_date, YearMonth};
use snowcover_core::io::{read_geotiff, write_geotiff};
use snowcover_core::projection::{Projection, MODIS_SCALE};
use snowcover_core::raster::{GeoTransform, Raster};
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::vector::FeatureCollection;

const ORIGIN_X: f64 = -7_500_000.0;
const ORIGIN_Y: f64 = -3_500_000.0;
const SIZE: usize = 4;

fn on_grid(values: Vec<f64>) -> Raster<f64> {
    let mut r = Raster::from_vec(values, SIZE, SIZE).unwrap();
    r.set_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, MODIS_SCALE, -MODIS_SCALE));
    r.set_projection(Some(Projection::modis_sinusoidal()));
    r
}

fn constant(value: f64) -> Raster<f64> {
    on_grid(vec![value; SIZE * SIZE])
}

/// NDSI 80 with no albedo class flag: snow everywhere
fn snow_frame(date: &str) -> RasterFrame<BandSet> {
    modis_frame(date, constant(80.0), constant(f64::NAN))
}

fn modis_frame(date: &str, ndsi: Raster<f64>, albedo: Raster<f64>) -> RasterFrame<BandSet> {
    RasterFrame::on_date(
        parse_date(date).unwrap(),
        BandSet::new()
            .with(NDSI_SNOW_COVER, ndsi)
            .with(SNOW_ALBEDO_CLASS, albedo),
    )
}

fn series(frames: Vec<RasterFrame<BandSet>>) -> RasterSeries<BandSet> {
    RasterSeries::from_frames(frames).unwrap()
}

fn whole_tile() -> ClipRegion {
    let (min_x, max_y) = (ORIGIN_X, ORIGIN_Y);
    let max_x = min_x + MODIS_SCALE * SIZE as f64;
    let min_y = max_y - MODIS_SCALE * SIZE as f64;
    let geojson = format!(
        r#"{{"type": "FeatureCollection", "features": [{{"type": "Feature", "properties": {{}},
            "geometry": {{"type": "Polygon", "coordinates": [[[{min_x}, {min_y}], [{max_x}, {min_y}],
            [{max_x}, {max_y}], [{min_x}, {max_y}], [{min_x}, {min_y}]]]}}}}]}}"#
    );
    ClipRegion::from_features(&geojson.parse::<FeatureCollection>().unwrap())
}

fn assert_all(raster: &Raster<f64>, expected: f64) {
    for v in raster.data().iter() {
        assert_eq!(*v, expected);
    }
}

#[test]
fn single_day_constant_snow() {
    let params = PipelineParams {
        incomplete_window: IncompleteWindow::PassThrough,
        ..PipelineParams::default()
    };
    let out = tac_reclass_and_impute(
        series(vec![snow_frame("2023-01-15")]),
        series(vec![snow_frame("2023-01-15")]),
        &whole_tile(),
        &constant(1000.0),
        &params,
    )
    .unwrap();

    assert_eq!(out.len(), 1);
    let frame = &out.frames()[0];
    assert_eq!(frame.date().unwrap(), parse_date("2023-01-15").unwrap());
    assert_all(&frame.bands.cloud_tac, 0.0);
    assert_all(&frame.bands.snow_tac, 100.0);
    assert_all(&frame.bands.qa_cr, 12.0);
}

#[test]
fn surrounded_day_constant_snow_under_drop() {
    let days = ["2023-01-13", "2023-01-14", "2023-01-15", "2023-01-16", "2023-01-17"];
    let terra = series(days.iter().map(|d| snow_frame(d)).collect());
    let aqua = series(days.iter().map(|d| snow_frame(d)).collect());

    let out = tac_reclass_and_impute(terra, aqua, &whole_tile(), &constant(1000.0), &PipelineParams::default())
        .unwrap();

    assert_eq!(out.len(), 1);
    let frame = &out.frames()[0];
    assert_eq!(frame.date().unwrap(), parse_date("2023-01-15").unwrap());
    assert_all(&frame.bands.cloud_tac, 0.0);
    assert_all(&frame.bands.snow_tac, 100.0);
    assert_all(&frame.bands.qa_cr, 12.0);
}

#[test]
fn cloudy_day_filled_from_neighbors() {
    // Terra and Aqua both see cloud (albedo class 150, no NDSI) on the 15th
    let cloudy = || modis_frame("2023-01-15", constant(f64::NAN), constant(150.0));
    let days = ["2023-01-13", "2023-01-14", "2023-01-16", "2023-01-17"];

    let mut terra: Vec<_> = days.iter().map(|d| snow_frame(d)).collect();
    terra.push(cloudy());
    let mut aqua: Vec<_> = days.iter().map(|d| snow_frame(d)).collect();
    aqua.push(cloudy());

    let out = tac_reclass_and_impute(
        series(terra),
        series(aqua),
        &whole_tile(),
        &constant(1000.0),
        &PipelineParams::default(),
    )
    .unwrap();

    let frame = out.get_date(parse_date("2023-01-15").unwrap()).unwrap();
    assert_all(&frame.bands.snow_tac, 100.0);
    assert_all(&frame.bands.cloud_tac, 0.0);
    assert_all(&frame.bands.qa_cr, 20.0);
}

#[test]
fn persistent_cloud_hole_filled_spatially() {
    // One pixel stays cloudy all week; its neighbors are always snow
    let mut ndsi = vec![80.0; SIZE * SIZE];
    let mut albedo = vec![f64::NAN; SIZE * SIZE];
    ndsi[5] = f64::NAN;
    albedo[5] = 150.0;
    let holed = |d: &str| modis_frame(d, on_grid(ndsi.clone()), on_grid(albedo.clone()));

    let days = ["2023-01-13", "2023-01-14", "2023-01-15", "2023-01-16", "2023-01-17"];
    let terra = series(days.iter().map(|d| holed(d)).collect());
    let aqua = series(days.iter().map(|d| holed(d)).collect());

    let out = tac_reclass_and_impute(terra, aqua, &whole_tile(), &constant(1000.0), &PipelineParams::default())
        .unwrap();
    let frame = &out.frames()[0];
    // 4 snowy edge neighbors: 9 * 4 = 36 -> snow
    assert_eq!(frame.bands.snow_tac.get(1, 1).unwrap(), 100.0);
    assert_eq!(frame.bands.qa_cr.get(1, 1).unwrap(), 40.0);
    assert_eq!(frame.bands.qa_cr.get(0, 0).unwrap(), 12.0);
}

#[test]
fn off_grid_input_is_rejected() {
    let mut ndsi = constant(80.0);
    ndsi.set_projection(Some(Projection::new("EPSG:4326", 0.005)));
    let mut albedo = constant(f64::NAN);
    albedo.set_projection(Some(Projection::new("EPSG:4326", 0.005)));

    let params = PipelineParams {
        incomplete_window: IncompleteWindow::PassThrough,
        ..PipelineParams::default()
    };
    let result = tac_reclass_and_impute(
        series(vec![modis_frame("2023-01-15", ndsi, albedo)]),
        series(vec![snow_frame("2023-01-15")]),
        &whole_tile(),
        &constant(1000.0),
        &params,
    );
    assert!(result.is_err());
}

#[test]
fn monthly_composite_written_to_geotiff() {
    let days = ["2023-01-13", "2023-01-14", "2023-01-15", "2023-01-16", "2023-01-17"];
    let terra = series(days.iter().map(|d| snow_frame(d)).collect());
    let aqua = series(days.iter().map(|d| snow_frame(d)).collect());
    let region = whole_tile();

    let daily = tac_reclass_and_impute(terra, aqua, &region, &constant(1000.0), &PipelineParams::default())
        .unwrap();
    let month = YearMonth::new(2023, 1).unwrap();
    let composite = monthly_mean(month, &daily, &region).unwrap();
    assert_all(&composite.bands.snow_tac, 100.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Snow_TAC.tif");
    write_geotiff(&composite.bands.snow_tac, &path).unwrap();
    let back: Raster<f64> = read_geotiff(&path).unwrap();
    assert_eq!(back.shape(), (SIZE, SIZE));
    assert_all(&back, 100.0);
}
