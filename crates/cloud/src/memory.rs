//! In-memory asset store with the same contract as [`LocalStore`](crate::local::LocalStore).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::{CloudError, Result};
use crate::service::{AssetInfo, AssetType, ComputeService, ExportRequest, TaskId, TaskState};
use crate::tasks::TaskRegistry;
use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
use snowcover_core::vector::FeatureCollection;

#[derive(Debug, Clone)]
enum Asset {
    Folder,
    ImageCollection,
    Image(RasterFrame<BandSet>),
    Table(FeatureCollection),
}

impl Asset {
    fn asset_type(&self) -> AssetType {
        match self {
            Self::Folder => AssetType::Folder,
            Self::ImageCollection => AssetType::ImageCollection,
            Self::Image(_) => AssetType::Image,
            Self::Table(_) => AssetType::Table,
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or_default()
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Asset store held in memory.
///
/// The empty path is the root Folder. Parents are not created
/// implicitly, except by [`create_folder`](Self::create_folder).
pub struct InMemoryStore {
    assets: RwLock<BTreeMap<String, Asset>>,
    tasks: TaskRegistry,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(String::new(), Asset::Folder);
        Self {
            assets: RwLock::new(assets),
            tasks: TaskRegistry::new("MEM"),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Asset>> {
        self.assets.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Asset>> {
        self.assets.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, path: &str, asset: Asset) -> Result<()> {
        let path = normalize(path);
        let parent = parent_of(&path).to_string();
        let mut assets = self.write();
        let parent_type = assets.get(&parent).map(Asset::asset_type);
        match parent_type {
            Some(t) if t.is_container() => {
                assets.insert(path, asset);
                Ok(())
            }
            Some(actual) => Err(CloudError::AssetType {
                path: parent,
                expected: "FOLDER or IMAGE_COLLECTION".to_string(),
                actual,
            }),
            None => Err(CloudError::AssetNotFound(parent)),
        }
    }

    /// Create a Folder and any missing parent Folders.
    pub fn create_folder(&self, path: &str) -> Result<()> {
        let path = normalize(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = crate::service::join_asset_path(&current, part);
            if !self.read().contains_key(&current) {
                self.insert(&current, Asset::Folder)?;
            }
        }
        Ok(())
    }

    pub fn create_collection(&self, path: &str) -> Result<()> {
        self.insert(path, Asset::ImageCollection)
    }

    pub fn insert_image(&self, path: &str, image: RasterFrame<BandSet>) -> Result<()> {
        self.insert(path, Asset::Image(image))
    }

    pub fn insert_table(&self, path: &str, table: FeatureCollection) -> Result<()> {
        self.insert(path, Asset::Table(table))
    }

    /// Images directly under a collection, in path order.
    fn collection_images(&self, path: &str) -> Result<Vec<RasterFrame<BandSet>>> {
        self.check_asset(path, &[AssetType::ImageCollection])?;
        let path = normalize(path);
        Ok(self
            .read()
            .iter()
            .filter(|(p, _)| parent_of(p) == path && !p.is_empty())
            .filter_map(|(_, a)| match a {
                Asset::Image(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect())
    }
}

impl ComputeService for InMemoryStore {
    fn get_asset(&self, path: &str) -> Result<AssetInfo> {
        let key = normalize(path);
        self.read()
            .get(&key)
            .map(|a| AssetInfo::new(key.clone(), a.asset_type()))
            .ok_or_else(|| CloudError::AssetNotFound(path.to_string()))
    }

    fn list_assets(&self, parent: &str) -> Result<Vec<AssetInfo>> {
        self.check_asset(parent, &[AssetType::Folder, AssetType::ImageCollection])?;
        let parent = normalize(parent);
        Ok(self
            .read()
            .iter()
            .filter(|(p, _)| !p.is_empty() && parent_of(p) == parent)
            .map(|(p, a)| AssetInfo::new(p.clone(), a.asset_type()))
            .collect())
    }

    fn series_dates(&self, path: &str) -> Result<Vec<NaiveDate>> {
        let mut dates = self
            .collection_images(path)?
            .iter()
            .map(|f| f.date())
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
        let frames = self
            .collection_images(path)?
            .into_iter()
            .filter(|f| f.date().is_ok_and(|d| dates.contains(&d)))
            .collect();
        Ok(RasterSeries::from_frames(frames)?)
    }

    fn read_image(&self, path: &str) -> Result<RasterFrame<BandSet>> {
        match self.read().get(&normalize(path)) {
            Some(Asset::Image(frame)) => Ok(frame.clone()),
            Some(other) => Err(CloudError::AssetType {
                path: path.to_string(),
                expected: AssetType::Image.to_string(),
                actual: other.asset_type(),
            }),
            None => Err(CloudError::AssetNotFound(path.to_string())),
        }
    }

    fn read_table(&self, path: &str) -> Result<FeatureCollection> {
        match self.read().get(&normalize(path)) {
            Some(Asset::Table(table)) => Ok(table.clone()),
            Some(other) => Err(CloudError::AssetType {
                path: path.to_string(),
                expected: AssetType::Table.to_string(),
                actual: other.asset_type(),
            }),
            None => Err(CloudError::AssetNotFound(path.to_string())),
        }
    }

    fn create_export(&self, request: ExportRequest) -> Result<TaskId> {
        self.check_asset(
            parent_of(&normalize(&request.asset_path)),
            &[AssetType::Folder, AssetType::ImageCollection],
        )?;
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
        let state = match self.insert_image(&request.asset_path, request.image) {
            Ok(()) => TaskState::Completed,
            Err(_) => TaskState::Failed,
        };
        self.tasks.set_state(id, state);
        Ok(())
    }

    fn task_status(&self, id: &TaskId) -> Result<TaskState> {
        self.tasks.state(id)
    }
}
