use std::{path::{Path, PathBuf}, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

use crate::{
    common,
    error::{GridError, GridResult},
    grid::Grid,
    io,
    join::RelationTable,
    place::PlaceLayer,
};
use super::manifest::Manifest;

const GRID_FILE: &str = "grid.geojson";
const MANIFEST_FILE: &str = "manifest.json";

/// Directory of persisted grids and relation tables, one `grid_<spacing>/` subdirectory per spacing.
///
/// Each file is replaced atomically and its hash recorded in `manifest.json`.
/// While a file is being replaced its manifest entry is absent, so a crash
/// part-way leaves an entry-less file that readers reject.
///
/// Clones share one lock, so writes and reads through clones of a store
/// see whole manifest updates. Separate stores over one root do not.
#[derive(Debug, Clone)]
pub struct GridStore {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl GridStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), lock: Arc::new(Mutex::new(())) }
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    /// Directory holding everything for `spacing`.
    pub fn dir(&self, spacing: f64) -> PathBuf { self.root.join(Grid::dir_name(spacing)) }

    /// Path of the grid file for `spacing`.
    pub fn grid_path(&self, spacing: f64) -> PathBuf { self.dir(spacing).join(GRID_FILE) }

    /// Path of the relation table for `spacing` and `layer`.
    pub fn relations_path(&self, spacing: f64, layer: PlaceLayer) -> PathBuf {
        self.dir(spacing).join(layer.relation_file_name())
    }

    fn manifest_path(&self, spacing: f64) -> PathBuf { self.dir(spacing).join(MANIFEST_FILE) }

    /// Current manifest for `spacing`, or a fresh one if none has been written.
    fn manifest_or_new(&self, spacing: f64) -> GridResult<Manifest> {
        let path = self.manifest_path(spacing);
        if path.exists() { Manifest::read(&path) } else { Ok(Manifest::new(spacing)) }
    }

    /// Replace `name` under the spacing directory, keeping the manifest in step.
    fn put(&self, spacing: f64, name: &str, bytes: &[u8], rows: usize) -> GridResult<PathBuf> {
        let _guard = self.lock.lock();
        common::ensure_dir_exists(&self.dir(spacing))?;
        let manifest_path = self.manifest_path(spacing);
        let mut manifest = self.manifest_or_new(spacing)?;

        manifest.forget(name);
        manifest.write(&manifest_path)?;

        let path = self.dir(spacing).join(name);
        common::write_atomic(&path, bytes)?;

        manifest.record(name, bytes, rows);
        manifest.write(&manifest_path)?;
        Ok(path)
    }

    /// Read `name` and check it against the manifest.
    fn get(&self, spacing: f64, name: &str) -> GridResult<(Vec<u8>, Manifest)> {
        let _guard = self.lock.lock();
        let path = self.dir(spacing).join(name);
        common::require_file_exists(&path)?;

        let manifest_path = self.manifest_path(spacing);
        if !manifest_path.exists() {
            return Err(GridError::corrupt(&path, "manifest.json is missing"));
        }
        let manifest = Manifest::read(&manifest_path)?;
        if manifest.spacing() != spacing {
            return Err(GridError::corrupt(&manifest_path, format!(
                "manifest spacing {} does not match directory spacing {spacing}", manifest.spacing()
            )));
        }

        let bytes = std::fs::read(&path)?;
        manifest.verify(name, &bytes, &path)?;
        Ok((bytes, manifest))
    }

    /// Persist the grid, replacing any previous grid of the same spacing.
    pub fn write_grid(&self, grid: &Grid) -> GridResult<PathBuf> {
        let bytes = io::write_grid_geojson(grid)?;
        let path = self.put(grid.spacing(), GRID_FILE, &bytes, grid.len())?;
        info!(path = %path.display(), cells = grid.len(), "stored grid");
        Ok(path)
    }

    /// Load the grid for `spacing`.
    pub fn read_grid(&self, spacing: f64) -> GridResult<Grid> {
        let (bytes, _) = self.get(spacing, GRID_FILE)?;
        io::read_grid_geojson(&bytes, &self.grid_path(spacing))
    }

    /// Persist a relation table, replacing any previous table of the same spacing and layer.
    pub fn write_relations(&self, spacing: f64, table: &RelationTable) -> GridResult<PathBuf> {
        let bytes = io::csv::write_csv_bytes(&table.to_dataframe()?)?;
        let path = self.put(spacing, table.layer().relation_file_name(), &bytes, table.len())?;
        info!(layer = %table.layer(), path = %path.display(), rows = table.len(), "stored relation table");
        Ok(path)
    }

    /// Load the relation table for `spacing` and `layer`.
    pub fn read_relations(&self, spacing: f64, layer: PlaceLayer) -> GridResult<RelationTable> {
        let path = self.relations_path(spacing, layer);
        let (bytes, manifest) = self.get(spacing, layer.relation_file_name())?;

        let df = io::csv::read_csv_bytes(&bytes)?;
        let table = RelationTable::from_dataframe(layer, &df, &path)?;

        if let Some(entry) = manifest.entry(layer.relation_file_name()) {
            if entry.rows != table.len() {
                return Err(GridError::corrupt(&path, format!("expected {} rows, found {}", entry.rows, table.len())));
            }
        }
        if let Some(grid) = manifest.entry(GRID_FILE) {
            table.check_grid_ids(grid.rows).map_err(|detail| GridError::corrupt(&path, detail))?;
        }
        Ok(table)
    }
}
