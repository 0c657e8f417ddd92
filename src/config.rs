use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    common,
    data::JoinOptions,
    error::{GridError, GridResult},
    join::JoinPredicate,
    place::{NamePolicy, PlaceLayer},
};

/// Pipeline settings; missing keys in a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Directory holding the country and city sources.
    pub shapefile_dir: PathBuf,
    /// Directory holding gridded variable tables.
    pub data_dir: PathBuf,
    /// Root of the grid/relation store.
    pub store_dir: PathBuf,
    pub spacing: f64,
    pub countries_file: String,
    pub cities_file: String,
    pub predicate: JoinPredicate,
    pub name_policy: NamePolicy,
    pub min_match_rate: f64,
    pub strict_join: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            shapefile_dir: "./data/shapefiles/".into(),
            data_dir: "./data/meteorological/".into(),
            store_dir: "./data/ids/".into(),
            spacing: 2.5,
            countries_file: "World_Countries__Generalized_.shp".into(),
            cities_file: "World_Cities.shp".into(),
            predicate: JoinPredicate::default(),
            name_policy: NamePolicy::default(),
            min_match_rate: JoinOptions::default().min_match_rate,
            strict_join: false,
        }
    }
}

impl GridConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> GridResult<Self> {
        common::require_file_exists(path)?;
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| GridError::schema(path.display().to_string(), e.to_string()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Path of the source for `layer`.
    pub fn source_path(&self, layer: PlaceLayer) -> PathBuf {
        match layer {
            PlaceLayer::Country => self.shapefile_dir.join(&self.countries_file),
            PlaceLayer::City => self.shapefile_dir.join(&self.cities_file),
        }
    }

    pub fn join_options(&self) -> JoinOptions {
        JoinOptions { min_match_rate: self.min_match_rate, strict: self.strict_join, ..JoinOptions::default() }
    }
}
