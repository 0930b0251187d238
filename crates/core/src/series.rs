//! Dated raster frames and time-ordered series of them

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::calendar::{date_to_millis, millis_to_date};
use crate::error::{Error, Result};
use crate::raster::Raster;

/// Name-keyed set of f64 bands, used where band names come from storage.
///
/// Pipeline stages convert to typed band structs at their boundaries;
/// a missing band surfaces there as [`Error::MissingBand`].
#[derive(Debug, Clone, Default)]
pub struct BandSet {
    bands: BTreeMap<String, Raster<f64>>,
}

impl BandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a band
    pub fn insert(&mut self, name: impl Into<String>, band: Raster<f64>) {
        self.bands.insert(name.into(), band);
    }

    /// Builder form of [`BandSet::insert`]
    pub fn with(mut self, name: impl Into<String>, band: Raster<f64>) -> Self {
        self.insert(name, band);
        self
    }

    /// Borrow a band by name
    pub fn get(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .get(name)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    /// Take a band out by name
    pub fn take(&mut self, name: &str) -> Result<Raster<f64>> {
        self.bands
            .remove(name)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    /// Band names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Keep only the listed bands, failing if any is absent
    pub fn select(&self, names: &[&str]) -> Result<BandSet> {
        let mut out = BandSet::new();
        for &name in names {
            out.insert(name, self.get(name)?.clone());
        }
        Ok(out)
    }
}

/// A dated set of bands: one image of a series.
///
/// `time_start` is milliseconds since the epoch (`system:time_start`).
/// Scalar properties travel alongside the bands.
#[derive(Debug, Clone)]
pub struct RasterFrame<B> {
    pub time_start: i64,
    pub bands: B,
    pub properties: BTreeMap<String, Value>,
}

impl<B> RasterFrame<B> {
    pub fn new(time_start: i64, bands: B) -> Self {
        Self {
            time_start,
            bands,
            properties: BTreeMap::new(),
        }
    }

    /// Frame dated at midnight UTC of `date`
    pub fn on_date(date: NaiveDate, bands: B) -> Self {
        Self::new(date_to_millis(date), bands)
    }

    /// UTC date of the frame
    pub fn date(&self) -> Result<NaiveDate> {
        millis_to_date(self.time_start)
    }

    /// Set a scalar property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Same timestamp and properties, different bands
    pub fn map_bands<C>(self, f: impl FnOnce(B) -> C) -> RasterFrame<C> {
        RasterFrame {
            time_start: self.time_start,
            bands: f(self.bands),
            properties: self.properties,
        }
    }

    /// Fallible form of [`RasterFrame::map_bands`]
    pub fn try_map_bands<C, E>(
        self,
        f: impl FnOnce(B) -> std::result::Result<C, E>,
    ) -> std::result::Result<RasterFrame<C>, E> {
        Ok(RasterFrame {
            time_start: self.time_start,
            bands: f(self.bands)?,
            properties: self.properties,
        })
    }
}

/// Time-ordered collection of frames, unique by timestamp.
///
/// Frames are kept sorted by `time_start` whatever order they are
/// inserted in.
#[derive(Debug, Clone)]
pub struct RasterSeries<B> {
    frames: Vec<RasterFrame<B>>,
}

impl<B> Default for RasterSeries<B> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<B> RasterSeries<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series, sorting frames and rejecting duplicate timestamps
    pub fn from_frames(mut frames: Vec<RasterFrame<B>>) -> Result<Self> {
        frames.sort_by_key(|f| f.time_start);
        if let Some(w) = frames.windows(2).find(|w| w[0].time_start == w[1].time_start) {
            return Err(Error::DuplicateTimestamp(w[0].time_start));
        }
        Ok(Self { frames })
    }

    /// Insert a frame at its sorted position
    pub fn push(&mut self, frame: RasterFrame<B>) -> Result<()> {
        match self
            .frames
            .binary_search_by_key(&frame.time_start, |f| f.time_start)
        {
            Ok(_) => Err(Error::DuplicateTimestamp(frame.time_start)),
            Err(pos) => {
                self.frames.insert(pos, frame);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[RasterFrame<B>] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RasterFrame<B>> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<RasterFrame<B>> {
        self.frames
    }

    /// Frame with exactly this timestamp
    pub fn get(&self, time_start: i64) -> Option<&RasterFrame<B>> {
        self.frames
            .binary_search_by_key(&time_start, |f| f.time_start)
            .ok()
            .map(|i| &self.frames[i])
    }

    /// First frame whose timestamp falls on `date` (UTC)
    pub fn get_date(&self, date: NaiveDate) -> Option<&RasterFrame<B>> {
        let start = date_to_millis(date);
        let i = self.frames.partition_point(|f| f.time_start < start);
        self.frames
            .get(i)
            .filter(|f| f.date().is_ok_and(|d| d == date))
    }

    /// Frame dates, ascending
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        self.frames.iter().map(RasterFrame::date).collect()
    }

    /// Set of frame dates
    pub fn date_set(&self) -> Result<BTreeSet<NaiveDate>> {
        self.frames.iter().map(RasterFrame::date).collect()
    }

    /// Keep only frames whose date is in `dates`
    pub fn filter_dates(self, dates: &BTreeSet<NaiveDate>) -> Self {
        let frames = self
            .frames
            .into_iter()
            .filter(|f| f.date().is_ok_and(|d| dates.contains(&d)))
            .collect();
        Self { frames }
    }

    /// Apply a band transform to every frame, keeping timestamps
    pub fn map<C>(self, mut f: impl FnMut(B) -> C) -> RasterSeries<C> {
        RasterSeries {
            frames: self.frames.into_iter().map(|fr| fr.map_bands(&mut f)).collect(),
        }
    }
}

impl<B> IntoIterator for RasterSeries<B> {
    type Item = RasterFrame<B>;
    type IntoIter = std::vec::IntoIter<RasterFrame<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a, B> IntoIterator for &'a RasterSeries<B> {
    type Item = &'a RasterFrame<B>;
    type IntoIter = std::slice::Iter<'a, RasterFrame<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    fn frame(date: &str, value: f64) -> RasterFrame<BandSet> {
        let bands = BandSet::new().with("TAC", Raster::filled(2, 2, value));
        RasterFrame::on_date(parse_date(date).unwrap(), bands)
    }

    #[test]
    fn test_series_sorted_by_time() {
        let series = RasterSeries::from_frames(vec![
            frame("2023-01-03", 0.0),
            frame("2023-01-01", 50.0),
            frame("2023-01-02", 100.0),
        ])
        .unwrap();
        let dates: Vec<String> = series
            .dates()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(dates, vec!["2023-01-01", "2023-01-02", "2023-01-03"]);
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let err = RasterSeries::from_frames(vec![
            frame("2023-01-01", 0.0),
            frame("2023-01-01", 50.0),
        ]);
        assert!(matches!(err, Err(Error::DuplicateTimestamp(_))));

        let mut series = RasterSeries::new();
        series.push(frame("2023-01-02", 0.0)).unwrap();
        series.push(frame("2023-01-01", 0.0)).unwrap();
        assert!(series.push(frame("2023-01-02", 100.0)).is_err());
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_filter_dates_and_lookup() {
        let series = RasterSeries::from_frames(vec![
            frame("2023-01-01", 0.0),
            frame("2023-01-02", 50.0),
        ])
        .unwrap();
        let day2 = parse_date("2023-01-02").unwrap();
        let tac = series.get_date(day2).unwrap().bands.get("TAC").unwrap();
        assert_eq!(tac.get(0, 0).unwrap(), 50.0);

        let mut late = frame("2023-01-03", 100.0);
        late.time_start += 18 * 3_600_000;
        let mut series = series;
        series.push(late).unwrap();
        let day3 = parse_date("2023-01-03").unwrap();
        assert_eq!(series.get_date(day3).unwrap().time_start % 86_400_000, 18 * 3_600_000);
        assert!(series.get_date(parse_date("2023-01-04").unwrap()).is_none());

        let keep: BTreeSet<NaiveDate> = [day2].into_iter().collect();
        let filtered = series.filter_dates(&keep);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.dates().unwrap(), vec![day2]);
    }

    #[test]
    fn test_missing_band() {
        let bands = BandSet::new().with("TAC", Raster::filled(1, 1, 0.0));
        assert!(matches!(bands.get("QA_CR"), Err(Error::MissingBand(name)) if name == "QA_CR"));
        assert!(bands.select(&["TAC", "QA_CR"]).is_err());
        assert_eq!(bands.select(&["TAC"]).unwrap().len(), 1);
    }
}
