//! Monthly completeness checks and monthly mean composites

use chrono::NaiveDate;
use tracing::debug;

use crate::imagery::{reduce_bands, Reducer};
use crate::snow::bands::{CloudSnowBands, MonthlyBands};
use crate::vector::{clip_raster, ClipRegion};
use snowcover_core::calendar::{date_to_millis, month_range_dates, YearMonth};
use snowcover_core::series::{RasterFrame, RasterSeries};
use snowcover_core::{Error, Result};

/// Frame property holding the composite's year
pub const YEAR_PROPERTY: &str = "year";
/// Frame property holding the composite's month (1-12)
pub const MONTH_PROPERTY: &str = "month";

/// Months that are complete in `reference_dates`.
///
/// A month is complete when some reference date falls inside its buffered
/// range and some reference date is on or after the range's last day, so
/// no more data is expected for it. Output is sorted and deduplicated.
pub fn months_are_complete(
    months: &[YearMonth],
    reference_dates: &[NaiveDate],
    trailing_days: u32,
    leading_days: u32,
) -> Vec<YearMonth> {
    let mut complete: Vec<YearMonth> = months
        .iter()
        .copied()
        .filter(|&month| {
            let range = month_range_dates(month, trailing_days, leading_days);
            let has_data = reference_dates.iter().any(|d| range.contains(*d));
            let is_closed = reference_dates.iter().any(|d| *d >= range.max_leading_date);
            has_data && is_closed
        })
        .collect();
    complete.sort();
    complete.dedup();
    complete
}

/// Mean `Snow_TAC`/`Cloud_TAC` over the frames dated in `month`, clipped
/// to the AOI.
///
/// Buffer days outside the calendar month are ignored. The composite is
/// stamped with the month's first day and carries `year`/`month`
/// properties.
pub fn monthly_mean(
    month: YearMonth,
    series: &RasterSeries<CloudSnowBands>,
    region: &ClipRegion,
) -> Result<RasterFrame<MonthlyBands>> {
    let mut snow = Vec::new();
    let mut cloud = Vec::new();
    for frame in series.iter() {
        if month.contains(frame.date()?) {
            snow.push(&frame.bands.snow_tac);
            cloud.push(&frame.bands.cloud_tac);
        }
    }
    if snow.is_empty() {
        return Err(Error::Algorithm(format!("no images in month {}", month)));
    }
    debug!(%month, images = snow.len(), "Monthly mean");

    let bands = MonthlyBands {
        snow_tac: clip_raster(&reduce_bands(&snow, Reducer::Mean)?, region)?,
        cloud_tac: clip_raster(&reduce_bands(&cloud, Reducer::Mean)?, region)?,
    };
    Ok(RasterFrame::new(date_to_millis(month.first_day()), bands)
        .with_property(YEAR_PROPERTY, month.year())
        .with_property(MONTH_PROPERTY, month.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcover_core::calendar::parse_date;
    use snowcover_core::raster::Raster;
    use snowcover_core::vector::FeatureCollection;

    fn ym(s: &str) -> YearMonth {
        YearMonth::parse_strict(s).unwrap()
    }

    fn dates(list: &[&str]) -> Vec<NaiveDate> {
        list.iter().map(|d| parse_date(d).unwrap()).collect()
    }

    #[test]
    fn test_month_complete_on_last_day() {
        let months = [ym("2023-01")];
        assert_eq!(months_are_complete(&months, &dates(&["2023-01-31"]), 0, 0), months);
        assert!(months_are_complete(&months, &dates(&["2023-01-30"]), 0, 0).is_empty());
    }

    #[test]
    fn test_month_needs_leading_buffer() {
        let months = [ym("2023-02"), ym("2023-01")];
        let reference = dates(&["2023-01-15", "2023-02-01", "2023-02-02"]);
        assert_eq!(months_are_complete(&months, &reference, 2, 2), vec![ym("2023-01")]);
        assert!(months_are_complete(&[], &reference, 2, 2).is_empty());
    }

    #[test]
    fn test_month_without_data_is_incomplete() {
        let reference = dates(&["2023-05-10"]);
        assert!(months_are_complete(&[ym("2023-01")], &reference, 2, 2).is_empty());
    }

    fn frame(date: &str, snow: f64, cloud: f64) -> RasterFrame<CloudSnowBands> {
        RasterFrame::on_date(
            parse_date(date).unwrap(),
            CloudSnowBands {
                cloud_tac: Raster::filled(2, 2, cloud),
                snow_tac: Raster::filled(2, 2, snow),
                qa_cr: Raster::filled(2, 2, 12.0),
            },
        )
    }

    fn everywhere() -> ClipRegion {
        let aoi = FeatureCollection::from_geojson_str(
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 2], [0, 0]]]}"#,
        )
        .unwrap();
        ClipRegion::from_features(&aoi)
    }

    #[test]
    fn test_monthly_mean_excludes_buffer_days() {
        let series = RasterSeries::from_frames(vec![
            frame("2022-12-31", 0.0, 100.0),
            frame("2023-01-01", 100.0, 0.0),
            frame("2023-01-02", 0.0, 0.0),
            frame("2023-02-01", 0.0, 100.0),
        ])
        .unwrap();

        let out = monthly_mean(ym("2023-01"), &series, &everywhere()).unwrap();
        assert_eq!(out.date().unwrap(), parse_date("2023-01-01").unwrap());
        assert_eq!(out.bands.snow_tac.get(0, 0).unwrap(), 50.0);
        assert_eq!(out.bands.cloud_tac.get(1, 1).unwrap(), 0.0);
        assert_eq!(out.properties[YEAR_PROPERTY], 2023);
        assert_eq!(out.properties[MONTH_PROPERTY], 1);
    }

    #[test]
    fn test_monthly_mean_clips_to_region() {
        let series = RasterSeries::from_frames(vec![frame("2023-01-10", 100.0, 0.0)]).unwrap();
        let aoi = FeatureCollection::from_geojson_str(
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}"#,
        )
        .unwrap();
        let out = monthly_mean(ym("2023-01"), &series, &ClipRegion::from_features(&aoi)).unwrap();
        assert_eq!(out.bands.snow_tac.get(0, 0).unwrap(), 100.0);
        assert!(out.bands.snow_tac.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_monthly_mean_empty_month() {
        let series = RasterSeries::from_frames(vec![frame("2023-03-10", 100.0, 0.0)]).unwrap();
        assert!(monthly_mean(ym("2023-01"), &series, &everywhere()).is_err());
    }
}
