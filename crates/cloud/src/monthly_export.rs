//! Monthly export planning: which months to build, and their export tasks.
//!
//! Months already present under the monthly collection (by image name) are
//! skipped; the rest are built only once both Terra and Aqua have every
//! date of the month plus its buffer days, and a later date exists.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Local, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::exports::ExportTask;
use crate::service::{asset_name, join_asset_path, AssetType, ComputeService, ExportRequest};
use snowcover_algorithms::monthly::{monthly_mean, months_are_complete};
use snowcover_algorithms::pipeline::{tac_reclass_and_impute, PipelineParams};
use snowcover_algorithms::snow::untyped_frame;
use snowcover_algorithms::vector::ClipRegion;
use snowcover_core::calendar::{month_dates_seq, ym_sequence, YearMonth};
use snowcover_core::raster::Raster;
use snowcover_core::Error;

/// MODIS/Terra daily snow cover collection
pub const DEFAULT_TERRA_COLLECTION: &str = "MODIS/061/MOD10A1";
/// MODIS/Aqua daily snow cover collection
pub const DEFAULT_AQUA_COLLECTION: &str = "MODIS/061/MYD10A1";

/// Days before each month the temporal imputation needs
pub const TRAILING_DAYS: u32 = 2;
/// Days after each month the temporal imputation needs
pub const LEADING_DAYS: u32 = 2;

pub const FREQUENCY: &str = "monthly";

/// First month of the MODIS record considered for export
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 3, 1).unwrap_or(NaiveDate::MIN)
}

/// What happens to each planned export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Plan only: tasks are recorded as `mock_created`
    #[default]
    DryRun,
    /// Register real export tasks with the service
    Submit,
}

/// Inputs of [`monthly_export_proc`].
#[derive(Debug, Clone)]
pub struct MonthlyExportRequest {
    /// Folder or ImageCollection receiving the monthly images
    pub monthly_collection_path: String,
    pub aoi_path: String,
    pub dem_path: String,
    pub name_prefix: String,
    /// Months to consider instead of the full record
    pub months_list: Option<Vec<YearMonth>>,
    pub terra_collection: String,
    pub aqua_collection: String,
    pub mode: ExportMode,
    pub pipeline: PipelineParams,
    /// Last date of the full record (today by default)
    pub end_date: NaiveDate,
}

impl MonthlyExportRequest {
    pub fn new(
        monthly_collection_path: impl Into<String>,
        aoi_path: impl Into<String>,
        dem_path: impl Into<String>,
        name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            monthly_collection_path: monthly_collection_path.into(),
            aoi_path: aoi_path.into(),
            dem_path: dem_path.into(),
            name_prefix: name_prefix.into(),
            months_list: None,
            terra_collection: DEFAULT_TERRA_COLLECTION.to_string(),
            aqua_collection: DEFAULT_AQUA_COLLECTION.to_string(),
            mode: ExportMode::default(),
            pipeline: PipelineParams::default(),
            end_date: Local::now().date_naive(),
        }
    }

    pub fn with_months(mut self, months: Vec<YearMonth>) -> Self {
        self.months_list = Some(months);
        self
    }

    pub fn with_collections(mut self, terra: impl Into<String>, aqua: impl Into<String>) -> Self {
        self.terra_collection = terra.into();
        self.aqua_collection = aqua.into();
        self
    }

    pub fn with_mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = end_date;
        self
    }
}

/// Why a candidate month is not exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    AlreadyExported,
    MonthIncomplete,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExported => f.write_str("already exported"),
            Self::MonthIncomplete => f.write_str("Month incomplete"),
        }
    }
}

/// A `{month: reason}` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedMonth {
    pub month: YearMonth,
    pub reason: ExclusionReason,
}

impl Serialize for ExcludedMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.month.to_string(), &self.reason.to_string())?;
        map.end()
    }
}

impl fmt::Display for ExcludedMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.month, self.reason)
    }
}

fn serialize_months<S: Serializer>(
    months: &[YearMonth],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(months.iter().map(ToString::to_string))
}

/// Outcome of one planning run.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyExportResult {
    pub frequency: &'static str,
    #[serde(serialize_with = "serialize_months")]
    pub images_pending_export: Vec<YearMonth>,
    pub images_excluded: Vec<ExcludedMonth>,
    #[serde(serialize_with = "serialize_months")]
    pub images_to_export: Vec<YearMonth>,
    pub export_tasks: Vec<ExportTask>,
}

impl Default for MonthlyExportResult {
    fn default() -> Self {
        Self {
            frequency: FREQUENCY,
            images_pending_export: Vec::new(),
            images_excluded: Vec::new(),
            images_to_export: Vec::new(),
            export_tasks: Vec::new(),
        }
    }
}

/// Prefix with a trailing `_`, unless it already ends in `_` or `-`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('_') || prefix.ends_with('-') {
        prefix.to_string()
    } else {
        format!("{}_", prefix)
    }
}

/// Name of the monthly image: prefix followed by `YYYY_MM`.
pub fn export_image_name(prefix: &str, month: YearMonth) -> String {
    format!("{}{}", prefix, month.name_suffix())
}

/// Month encoded in the last seven characters of an image name
fn exported_month(name: &str) -> Option<YearMonth> {
    let chars: Vec<char> = name.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(7)..]
        .iter()
        .map(|&c| if c == '_' { '-' } else { c })
        .collect();
    YearMonth::parse_strict(&tail).ok()
}

/// Candidates with no `prefix…YYYY_MM` image under the collection, sorted.
pub fn images_pending_export<S>(
    service: &S,
    candidates: &[YearMonth],
    collection_path: &str,
    prefix: &str,
) -> Result<Vec<YearMonth>>
where
    S: ComputeService + ?Sized,
{
    let exported: BTreeSet<YearMonth> = service
        .list_assets(collection_path)?
        .iter()
        .filter(|a| a.asset_type == AssetType::Image)
        .map(|a| asset_name(&a.path))
        .filter(|name| name.starts_with(prefix))
        .filter_map(exported_month)
        .collect();

    let pending: BTreeSet<YearMonth> = candidates
        .iter()
        .filter(|m| !exported.contains(m))
        .copied()
        .collect();
    Ok(pending.into_iter().collect())
}

/// Every date the selected months and their buffers span.
pub fn export_filter_dates(months: &[YearMonth]) -> BTreeSet<NaiveDate> {
    months
        .iter()
        .flat_map(|&m| month_dates_seq(m, TRAILING_DAYS, LEADING_DAYS))
        .collect()
}

/// Band read from a multi-band DEM image
pub const DEM_BAND: &str = "elevation";

/// The DEM's elevation: its only band, or the `elevation` band of a
/// multi-band image
fn dem_band<S>(service: &S, path: &str) -> Result<Raster<f64>>
where
    S: ComputeService + ?Sized,
{
    let mut image = service.read_image(path)?;
    match image.bands.len() {
        0 => Err(CloudError::Core(Error::MissingBand(format!("{} has no bands", path)))),
        1 => {
            let name = image.bands.names().next().unwrap_or(DEM_BAND).to_string();
            Ok(image.bands.take(&name)?)
        }
        _ => Ok(image.bands.take(DEM_BAND)?),
    }
}

/// Plan and create the monthly exports.
///
/// Paths are assumed to have been validated by the caller. Incomplete and
/// already exported months are reported in the result, not raised.
pub fn monthly_export_proc<S>(
    service: &S,
    request: &MonthlyExportRequest,
) -> Result<MonthlyExportResult>
where
    S: ComputeService + ?Sized,
{
    info!("Starting Monthly Export Process");
    let prefix = normalize_prefix(&request.name_prefix);
    let mut result = MonthlyExportResult::default();

    let sequence: Vec<YearMonth> = match &request.months_list {
        Some(months) if !months.is_empty() => {
            let unique: BTreeSet<YearMonth> = months.iter().copied().collect();
            unique.into_iter().collect()
        }
        _ => ym_sequence(default_start_date(), request.end_date),
    };

    let pending = images_pending_export(
        service,
        &sequence,
        &request.monthly_collection_path,
        &prefix,
    )?;
    info!(pending = ?display_months(&pending), "Images pending export");

    if request.months_list.as_ref().is_some_and(|m| !m.is_empty()) {
        let excluded: Vec<ExcludedMonth> = sequence
            .iter()
            .filter(|m| !pending.contains(m))
            .map(|&month| ExcludedMonth {
                month,
                reason: ExclusionReason::AlreadyExported,
            })
            .collect();
        if !excluded.is_empty() {
            info!(excluded = ?display_months(&excluded.iter().map(|e| e.month).collect::<Vec<_>>()), "Images excluded: already exported");
        }
        result.images_excluded.extend(excluded);
    }

    if pending.is_empty() {
        return Ok(result);
    }
    result.images_pending_export = pending.clone();

    let terra_dates = service.series_dates(&request.terra_collection)?;
    let aqua_dates = service.series_dates(&request.aqua_collection)?;
    let terra_ok: BTreeSet<YearMonth> =
        months_are_complete(&pending, &terra_dates, TRAILING_DAYS, LEADING_DAYS)
            .into_iter()
            .collect();
    let aqua_ok: BTreeSet<YearMonth> =
        months_are_complete(&pending, &aqua_dates, TRAILING_DAYS, LEADING_DAYS)
            .into_iter()
            .collect();
    let to_export: Vec<YearMonth> = terra_ok.intersection(&aqua_ok).copied().collect();

    let incomplete: Vec<ExcludedMonth> = pending
        .iter()
        .filter(|m| !to_export.contains(m))
        .map(|&month| ExcludedMonth {
            month,
            reason: ExclusionReason::MonthIncomplete,
        })
        .collect();
    if !incomplete.is_empty() {
        info!(excluded = ?display_months(&incomplete.iter().map(|e| e.month).collect::<Vec<_>>()), "Images excluded: month incomplete");
    }
    result.images_excluded.extend(incomplete);

    if to_export.is_empty() {
        return Ok(result);
    }
    info!(months = ?display_months(&to_export), "Images to export");
    result.images_to_export = to_export.clone();

    let dates = export_filter_dates(&to_export);
    let terra = service.read_series(&request.terra_collection, &dates)?;
    let aqua = service.read_series(&request.aqua_collection, &dates)?;
    let region = ClipRegion::from_features(&service.read_table(&request.aoi_path)?);
    let dem = dem_band(service, &request.dem_path)?;

    let daily = tac_reclass_and_impute(terra, aqua, &region, &dem, &request.pipeline)?;

    for month in to_export {
        let image_name = export_image_name(&prefix, month);
        let target = join_asset_path(&request.monthly_collection_path, &image_name);

        let task = match monthly_mean(month, &daily, &region) {
            Err(e) => ExportTask::failed_to_create(&image_name, &target, e),
            Ok(frame) => {
                let snow = frame.bands.snow_tac.statistics();
                debug!(
                    image = %image_name,
                    valid = snow.valid_count,
                    masked = snow.nodata_count,
                    mean_snow = ?snow.mean,
                    "Monthly composite"
                );
                match request.mode {
                    ExportMode::DryRun => ExportTask::mock(&image_name, &target),
                    ExportMode::Submit => {
                        let export = ExportRequest {
                            image: untyped_frame(frame),
                            asset_path: target.clone(),
                            description: image_name.clone(),
                        };
                        match service.create_export(export) {
                            Ok(id) => ExportTask::created(id, &image_name, &target),
                            Err(e) => ExportTask::failed_to_create(&image_name, &target, e),
                        }
                    }
                }
            }
        };
        debug!(image = %image_name, status = %task.status, "Export task");
        result.export_tasks.push(task);
    }

    Ok(result)
}

fn display_months(months: &[YearMonth]) -> Vec<String> {
    months.iter().map(ToString::to_string).collect()
}
