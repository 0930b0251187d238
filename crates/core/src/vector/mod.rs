//! Area-of-interest vector types read from GeoJSON

use geo_types::Geometry;
use geojson::GeoJson;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Map<String, Value>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Map::new(),
            id: None,
        }
    }

    fn from_geojson(feature: geojson::Feature) -> Result<Self> {
        let geometry = feature
            .geometry
            .map(Geometry::<f64>::try_from)
            .transpose()?;
        let id = feature.id.map(|id| match id {
            geojson::feature::Id::String(s) => s,
            geojson::feature::Id::Number(n) => n.to_string(),
        });
        Ok(Self {
            geometry,
            properties: feature.properties.unwrap_or_default(),
            id,
        })
    }
}

/// Collection of features, e.g. the polygons of an AOI
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a GeoJSON document: a FeatureCollection, a single Feature or a bare Geometry
    pub fn from_geojson_str(s: &str) -> Result<Self> {
        let features = match GeoJson::from_str(s)? {
            GeoJson::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .map(Feature::from_geojson)
                .collect::<Result<Vec<_>>>()?,
            GeoJson::Feature(f) => vec![Feature::from_geojson(f)?],
            GeoJson::Geometry(g) => vec![Feature::new(Geometry::<f64>::try_from(g)?)],
        };
        Ok(Self { features })
    }

    /// Read a GeoJSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(&text)
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// All non-empty geometries
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().filter_map(|f| f.geometry.as_ref())
    }
}

impl FromStr for FeatureCollection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_geojson_str(s)
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
