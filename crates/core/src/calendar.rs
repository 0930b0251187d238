//! Calendar helpers: dates, year-months and buffer windows
//!
//! Dates are `chrono::NaiveDate` in UTC. Frame timestamps are milliseconds
//! since the Unix epoch at midnight UTC of the frame's date.

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A calendar month, ordered chronologically and displayed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a year-month, failing on months outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(Error::InvalidDate(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse exactly `YYYY-MM`
    pub fn parse_strict(s: &str) -> Result<Self> {
        let b = s.as_bytes();
        let well_formed = b.len() == 7
            && b[4] == b'-'
            && b[..4].iter().all(u8::is_ascii_digit)
            && b[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(Error::InvalidDate(format!(
                "month must be in the format 'YYYY-MM', got '{}'",
                s
            )));
        }
        s.parse()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // year and month are validated at construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The following month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether `date` falls in this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// `YYYY_MM`, the suffix used in exported image names
    pub fn name_suffix(&self) -> String {
        format!("{:04}_{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Lenient parse: accepts `YYYY-MM` and `YYYY-M`
impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [y, m] => {
                let year = parse_component(y, 4, 4)
                    .ok_or_else(|| Error::InvalidDate(s.to_string()))?;
                let month = parse_component(m, 1, 2)
                    .ok_or_else(|| Error::InvalidDate(s.to_string()))?;
                Self::new(year as i32, month).map_err(|_| Error::InvalidDate(s.to_string()))
            }
            _ => Err(Error::InvalidDate(s.to_string())),
        }
    }
}

fn parse_component(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a `YYYY-MM-DD` date, also accepting un-padded month and day
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = s.split('-').collect();
    let parsed = match parts.as_slice() {
        [y, m, d] => match (
            parse_component(y, 4, 4),
            parse_component(m, 1, 2),
            parse_component(d, 1, 2),
        ) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y as i32, m, d),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| Error::InvalidDate(s.to_string()))
}

pub fn is_valid_date(s: &str) -> bool {
    parse_date(s).is_ok()
}

pub fn is_valid_date_list<S: AsRef<str>>(dates: &[S]) -> bool {
    dates.iter().all(|d| is_valid_date(d.as_ref()))
}

pub fn is_valid_month(s: &str) -> bool {
    s.parse::<YearMonth>().is_ok()
}

pub fn is_valid_month_list<S: AsRef<str>>(months: &[S]) -> bool {
    months.iter().all(|m| is_valid_month(m.as_ref()))
}

pub fn is_valid_year(s: &str) -> bool {
    parse_component(s, 4, 4).is_some()
}

pub fn is_valid_year_list<S: AsRef<str>>(years: &[S]) -> bool {
    years.iter().all(|y| is_valid_year(y.as_ref()))
}

/// Current month in local machine time
pub fn current_year_month() -> YearMonth {
    YearMonth::from_date(Local::now().date_naive())
}

/// Last day of the month before the current one
pub fn prev_month_last_date() -> NaiveDate {
    current_year_month()
        .first_day()
        .pred_opt()
        .unwrap_or(NaiveDate::MIN)
}

/// Dates in `[date - trailing, date + leading]` excluding `date`, ascending
pub fn buffer_dates(date: NaiveDate, trailing: u32, leading: u32) -> Vec<NaiveDate> {
    let before = (1..=trailing as u64)
        .rev()
        .filter_map(|d| date.checked_sub_days(Days::new(d)));
    let after = (1..=leading as u64).filter_map(|d| date.checked_add_days(Days::new(d)));
    before.chain(after).collect()
}

/// First/last day of a month together with its trailing and leading buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRange {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    /// Days before `first_day`, ascending
    pub trailing_dates: Vec<NaiveDate>,
    /// Days after `last_day`, ascending
    pub leading_dates: Vec<NaiveDate>,
    /// Earliest date of the window (`first_day` when there is no trailing buffer)
    pub min_trailing_date: NaiveDate,
    /// Latest date of the window (`last_day` when there is no leading buffer)
    pub max_leading_date: NaiveDate,
}

impl MonthRange {
    /// Whether `date` lies inside `[min_trailing_date, max_leading_date]`
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.min_trailing_date && date <= self.max_leading_date
    }
}

pub fn month_range_dates(month: YearMonth, trailing: u32, leading: u32) -> MonthRange {
    let first_day = month.first_day();
    let last_day = month.last_day();
    let trailing_dates = buffer_dates(first_day, trailing, 0);
    let leading_dates = buffer_dates(last_day, 0, leading);
    let min_trailing_date = trailing_dates.first().copied().unwrap_or(first_day);
    let max_leading_date = leading_dates.last().copied().unwrap_or(last_day);

    MonthRange {
        first_day,
        last_day,
        trailing_dates,
        leading_dates,
        min_trailing_date,
        max_leading_date,
    }
}

/// Inclusive list of months spanned by `[start, end]`; empty when `start > end`
pub fn ym_sequence(start: NaiveDate, end: NaiveDate) -> Vec<YearMonth> {
    let last = YearMonth::from_date(end);
    let mut month = YearMonth::from_date(start);
    let mut out = Vec::new();
    while month <= last {
        out.push(month);
        month = month.succ();
    }
    out
}

/// Inclusive daily list between two dates; empty when `start > end`
pub fn dates_seq(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Every date from a month's `min_trailing_date` to its `max_leading_date`
pub fn month_dates_seq(month: YearMonth, trailing: u32, leading: u32) -> Vec<NaiveDate> {
    let range = month_range_dates(month, trailing, leading);
    dates_seq(range.min_trailing_date, range.max_leading_date)
}

/// Midnight UTC of `date` in milliseconds since the epoch
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// UTC date of a millisecond timestamp
pub fn millis_to_date(millis: i64) -> Result<NaiveDate> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Error::InvalidDate(format!("timestamp {} out of range", millis)))
}
