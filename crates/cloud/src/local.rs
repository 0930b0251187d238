//! Filesystem-backed asset store.
//!
//! Layout under the store root, for an asset path `a/b/c`:
//!
//! | asset            | on disk                                              |
//! |------------------|------------------------------------------------------|
//! | Folder           | directory `a/b/c/`                                   |
//! | ImageCollection  | directory `a/b/c/` holding `collection.json`         |
//! | Image            | directory `a/b/c/` holding `image.json` + `<band>.tif` |
//! | Table            | file `a/b/c.geojson`                                 |
//!
//! Export tasks write an Image when started and finish `COMPLETED` or
//! `FAILED`.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CloudError, Result};
use crate::service::{
    join_asset_path, AssetInfo, AssetType, ComputeService, ExportRequest, TaskId, TaskState,
};
use crate::tasks::TaskRegistry;
use snowcover_core::calendar::millis_to_date;
use snowcover_core::io::{read_geotiff, write_geotiff};
use snowcover_core::projection::Projection;
use snowcover_core::raster::Raster;
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::vector::FeatureCollection;

const COLLECTION_FILE: &str = "collection.json";
const IMAGE_FILE: &str = "image.json";
const TABLE_EXT: &str = "geojson";
const BAND_EXT: &str = "tif";

/// Contents of `image.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageMetadata {
    time_start: i64,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    projection: Option<Projection>,
}

/// Asset store rooted at a local directory.
pub struct LocalStore {
    root: PathBuf,
    tasks: TaskRegistry,
}

impl LocalStore {
    /// Open a store; the root directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CloudError::AssetNotFound(root.display().to_string()));
        }
        Ok(Self {
            root,
            tasks: TaskRegistry::new("LOCAL"),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fs_path(&self, path: &str) -> Result<PathBuf> {
        let mut out = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if part == "." || part == ".." || part.contains('\\') {
                return Err(CloudError::InvalidPath(path.to_string()));
            }
            out.push(part);
        }
        Ok(out)
    }

    fn table_file(&self, path: &str) -> Result<PathBuf> {
        let mut name: OsString = self.fs_path(path)?.into_os_string();
        name.push(".");
        name.push(TABLE_EXT);
        Ok(PathBuf::from(name))
    }

    fn dir_type(dir: &Path) -> AssetType {
        if dir.join(IMAGE_FILE).is_file() {
            AssetType::Image
        } else if dir.join(COLLECTION_FILE).is_file() {
            AssetType::ImageCollection
        } else {
            AssetType::Folder
        }
    }

    // -- Writing -----------------------------------------------------------

    /// Create a Folder (and any missing parents).
    pub fn create_folder(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.fs_path(path)?)?;
        Ok(())
    }

    /// Create an empty ImageCollection.
    pub fn create_collection(&self, path: &str) -> Result<()> {
        let dir = self.fs_path(path)?;
        fs::create_dir_all(&dir)?;
        let marker = serde_json::json!({ "type": AssetType::ImageCollection });
        fs::write(dir.join(COLLECTION_FILE), serde_json::to_vec_pretty(&marker)?)?;
        Ok(())
    }

    /// Write an Image: metadata plus one GeoTIFF per band.
    pub fn write_image(&self, path: &str, image: &RasterFrame<BandSet>) -> Result<()> {
        let dir = self.fs_path(path)?;
        fs::create_dir_all(&dir)?;

        let metadata = ImageMetadata {
            time_start: image.time_start,
            properties: image.properties.clone(),
            projection: image.bands.iter().find_map(|(_, b)| b.projection().cloned()),
        };
        fs::write(dir.join(IMAGE_FILE), serde_json::to_vec_pretty(&metadata)?)?;

        for (name, band) in image.bands.iter() {
            write_geotiff(band, dir.join(format!("{}.{}", name, BAND_EXT)))?;
        }
        debug!(path, bands = image.bands.len(), "Wrote image");
        Ok(())
    }

    /// Write a Table from a GeoJSON document.
    pub fn write_table(&self, path: &str, geojson: &str) -> Result<()> {
        FeatureCollection::from_geojson_str(geojson)?;
        let file = self.table_file(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, geojson)?;
        Ok(())
    }

    // -- Reading -----------------------------------------------------------

    fn read_metadata(dir: &Path) -> Result<ImageMetadata> {
        let text = fs::read_to_string(dir.join(IMAGE_FILE))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn read_image_dir(dir: &Path, metadata: ImageMetadata) -> Result<RasterFrame<BandSet>> {
        let mut band_files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == BAND_EXT))
            .collect();
        band_files.sort();

        let mut bands = BandSet::new();
        for file in band_files {
            let Some(name) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let mut band: Raster<f64> = read_geotiff(&file)?;
            band.set_nodata(Some(f64::NAN));
            band.set_projection(metadata.projection.clone());
            bands.insert(name, band);
        }

        let mut frame = RasterFrame::new(metadata.time_start, bands);
        frame.properties = metadata.properties;
        Ok(frame)
    }

    /// Image directories of a collection with their metadata, by path.
    fn collection_images(&self, path: &str) -> Result<Vec<(PathBuf, ImageMetadata)>> {
        self.check_asset(path, &[AssetType::ImageCollection])?;
        let mut images = Vec::new();
        for child in self.list_assets(path)? {
            if child.asset_type == AssetType::Image {
                let dir = self.fs_path(&child.path)?;
                let metadata = Self::read_metadata(&dir)?;
                images.push((dir, metadata));
            }
        }
        Ok(images)
    }

    fn write_export(&self, request: &ExportRequest) -> Result<()> {
        let parent = request
            .asset_path
            .rsplit_once('/')
            .map(|(p, _)| p)
            .unwrap_or_default();
        self.check_asset(parent, &[AssetType::Folder, AssetType::ImageCollection])?;
        self.write_image(&request.asset_path, &request.image)
    }
}

impl ComputeService for LocalStore {
    fn get_asset(&self, path: &str) -> Result<AssetInfo> {
        let dir = self.fs_path(path)?;
        if dir.is_dir() {
            return Ok(AssetInfo::new(path, Self::dir_type(&dir)));
        }
        if self.table_file(path)?.is_file() {
            return Ok(AssetInfo::new(path, AssetType::Table));
        }
        Err(CloudError::AssetNotFound(path.to_string()))
    }

    fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>> {
        self.check_asset(parent, &[AssetType::Folder, AssetType::ImageCollection])?;
        let mut assets = Vec::new();
        for entry in fs::read_dir(self.fs_path(parent)?)? {
            let entry = entry?;
            let file_path = entry.path();
            let Some(name) = file_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_path.is_dir() {
                assets.push(AssetInfo::new(
                    join_asset_path(parent, name),
                    Self::dir_type(&file_path),
                ));
            } else if let Some(stem) = name.strip_suffix(&format!(".{}", TABLE_EXT)) {
                assets.push(AssetInfo::new(join_asset_path(parent, stem), AssetType::Table));
            }
        }
        assets.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(assets)
    }

    fn series_dates(&self, path: &str) -> Result<Vec<NaiveDate>> {
        let mut dates = self
            .collection_images(path)?
            .into_iter()
            .map(|(_, m)| millis_to_date(m.time_start))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if dates.is_empty() {
            return Err(CloudError::EmptyCollection(path.to_string()));
        }
        dates.sort();
        Ok(dates)
    }

    fn read_series(
        &self,
        path: &str,
        dates: &BTreeSet<NaiveDate>,
    ) -> Result<RasterSeries<BandSet>> {
        let mut frames = Vec::new();
        for (dir, metadata) in self.collection_images(path)? {
            if dates.contains(&millis_to_date(metadata.time_start)?) {
                frames.push(Self::read_image_dir(&dir, metadata)?);
            }
        }
        debug!(path, images = frames.len(), "Read series");
        Ok(RasterSeries::from_frames(frames)?)
    }

    fn read_image(&self, path: &str) -> Result<RasterFrame<BandSet>> {
        self.check_asset(path, &[AssetType::Image])?;
        let dir = self.fs_path(path)?;
        let metadata = Self::read_metadata(&dir)?;
        Self::read_image_dir(&dir, metadata)
    }

    fn read_table(&self, path: &str) -> Result<FeatureCollection> {
        self.check_asset(path, &[AssetType::Table])?;
        Ok(FeatureCollection::from_path(self.table_file(path)?)?)
    }

    fn create_export(&self, request: ExportRequest) -> Result<TaskId> {
        let parent = request
            .asset_path
            .rsplit_once('/')
            .map(|(p, _)| p)
            .unwrap_or_default();
        self.check_asset(parent, &[AssetType::Folder, AssetType::ImageCollection])?;
        if self.get_asset(&request.asset_path).is_ok() {
            return Err(CloudError::task(
                request.description,
                format!("asset {} already exists", request.asset_path),
            ));
        }
        Ok(self.tasks.register(request))
    }

    fn start_task(&self, id: &TaskId) -> Result<()> {
        let request = self.tasks.begin(id)?;
        match self.write_export(&request) {
            Ok(()) => self.tasks.set_state(id, TaskState::Completed),
            Err(e) => {
                warn!(task = %id, error = %e, "Export failed");
                self.tasks.set_state(id, TaskState::Failed);
            }
        }
        Ok(())
    }

    fn task_status(&self, id: &TaskId) -> Result<TaskState> {
        self.tasks.state(id)
    }
}
