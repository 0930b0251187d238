//! Temporal gap filling of TAC from neighboring days
//!
//! A cloud pixel (TAC 0) takes the value its trailing and leading days
//! agree on, when that value is land or snow. Three passes widen the
//! window: ±1/±1, -2/+1, -1/+2. Each pass refines the previous pass's
//! output, but trailing and leading values always come from the merged
//! (un-imputed) series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::imagery::band_math::raster_like;
use crate::maybe_rayon::*;
use crate::snow::bands::TacBands;
use snowcover_core::calendar::buffer_dates;
use snowcover_core::raster::Raster;
use snowcover_core::series::{RasterFrame, RasterSeries};
use snowcover_core::{Error, Result};

/// Days required on each side of a date for it to be imputed
pub const ELIGIBILITY_BUFFER_DAYS: u32 = 2;

/// One gap-filling pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalPass {
    pub trailing_days: u32,
    pub leading_days: u32,
    /// QA_CR code written where this pass imputes
    pub qa_value: f64,
}

/// The three passes, applied in order
pub const TEMPORAL_PASSES: [TemporalPass; 3] = [
    TemporalPass {
        trailing_days: 1,
        leading_days: 1,
        qa_value: 20.0,
    },
    TemporalPass {
        trailing_days: 2,
        leading_days: 1,
        qa_value: 21.0,
    },
    TemporalPass {
        trailing_days: 1,
        leading_days: 2,
        qa_value: 22.0,
    },
];

/// What to do with dates lacking a complete ±2-day window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncompleteWindow {
    /// Leave them out of the output
    #[default]
    Drop,
    /// Keep them, unimputed
    PassThrough,
}

/// Impute one target frame from its trailing and leading TAC.
///
/// Where target TAC is 0 and trailing == leading > 0 (both unmasked),
/// TAC takes that value and QA_CR becomes max(QA_CR, `qa_value`).
pub fn impute_tac_temporal(
    target: &TacBands,
    trailing_tac: &Raster<f64>,
    leading_tac: &Raster<f64>,
    qa_value: f64,
) -> Result<TacBands> {
    target.tac.ensure_same_grid(trailing_tac)?;
    target.tac.ensure_same_grid(leading_tac)?;
    target.tac.ensure_same_grid(&target.qa_cr)?;

    let (rows, cols) = target.tac.shape();
    let (tac, qa) = (target.tac.data(), target.qa_cr.data());
    let (trailing, leading) = (trailing_tac.data(), leading_tac.data());

    let cells: Vec<(f64, f64)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let t0 = tac[[row, col]];
                    let q0 = qa[[row, col]];
                    let tr = trailing[[row, col]];
                    let ld = leading[[row, col]];
                    // NaN compares false, so masked neighbors never impute
                    if t0 == 0.0 && tr == ld && tr > 0.0 {
                        (tr, if q0.is_nan() { qa_value } else { q0.max(qa_value) })
                    } else {
                        (t0, q0)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let (tac_data, qa_data): (Vec<f64>, Vec<f64>) = cells.into_iter().unzip();
    Ok(TacBands {
        tac: raster_like(&target.tac, tac_data)?,
        qa_cr: raster_like(&target.qa_cr, qa_data)?,
    })
}

/// Dates whose full ±2-day window is present in `dates`
pub fn eligible_dates(dates: &BTreeSet<NaiveDate>) -> BTreeSet<NaiveDate> {
    dates
        .iter()
        .filter(|d| {
            buffer_dates(**d, ELIGIBILITY_BUFFER_DAYS, ELIGIBILITY_BUFFER_DAYS)
                .iter()
                .all(|b| dates.contains(b))
        })
        .copied()
        .collect()
}

/// Merged TAC by calendar day; the first frame of a day wins
fn tac_by_date(reference: &RasterSeries<TacBands>) -> Result<BTreeMap<NaiveDate, &Raster<f64>>> {
    let mut by_date = BTreeMap::new();
    for frame in reference.iter() {
        by_date.entry(frame.date()?).or_insert(&frame.bands.tac);
    }
    Ok(by_date)
}

fn reference_tac<'a>(
    by_date: &BTreeMap<NaiveDate, &'a Raster<f64>>,
    date: NaiveDate,
    offset: i64,
) -> Result<&'a Raster<f64>> {
    let day = if offset < 0 {
        date.checked_sub_days(Days::new(offset.unsigned_abs()))
    } else {
        date.checked_add_days(Days::new(offset as u64))
    };
    day.and_then(|d| by_date.get(&d).copied())
        .ok_or_else(|| Error::Algorithm(format!("no reference frame {} days from {}", offset, date)))
}

/// Run the three passes over a merged series.
///
/// Each pass completes over every eligible date before the next starts.
pub fn ic_impute_tac_temporal(
    reference: &RasterSeries<TacBands>,
    policy: IncompleteWindow,
) -> Result<RasterSeries<TacBands>> {
    let by_date = tac_by_date(reference)?;
    let dates: BTreeSet<NaiveDate> = by_date.keys().copied().collect();
    let eligible = eligible_dates(&dates);
    info!(
        dates = dates.len(),
        eligible = eligible.len(),
        ?policy,
        "Temporal imputation"
    );

    let mut working: Vec<RasterFrame<TacBands>> = reference
        .iter()
        .filter(|f| f.date().is_ok_and(|d| eligible.contains(&d)))
        .cloned()
        .collect();

    for pass in TEMPORAL_PASSES {
        debug!(
            trailing = pass.trailing_days,
            leading = pass.leading_days,
            qa = pass.qa_value,
            "Temporal pass"
        );
        working = working
            .into_par_iter()
            .map(|frame| {
                let date = frame.date()?;
                let trailing = reference_tac(&by_date, date, -(pass.trailing_days as i64))?;
                let leading = reference_tac(&by_date, date, pass.leading_days as i64)?;
                frame.try_map_bands(|bands| {
                    impute_tac_temporal(&bands, trailing, leading, pass.qa_value)
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }

    if policy == IncompleteWindow::PassThrough {
        working.extend(
            reference
                .iter()
                .filter(|f| f.date().is_ok_and(|d| !eligible.contains(&d)))
                .cloned(),
        );
    }

    RasterSeries::from_frames(working)
}
