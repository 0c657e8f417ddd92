pub mod build;
pub mod lookup;
pub mod series;
pub mod variables;

use std::path::PathBuf;

use anyhow::{Context, Result};
use globegrid::{GridConfig, GridLookup, GridStore, PlaceCatalog, PlaceIndex, PlaceLayer};

use crate::cli::Cli;

/// Config from `--config`, or the defaults.
pub fn load_config(cli: &Cli) -> Result<GridConfig> {
    match &cli.config {
        Some(path) => GridConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None => Ok(GridConfig::default()),
    }
}

/// Resolve `--spacing`/`--store` overrides against the config.
pub fn store_and_spacing(config: &GridConfig, store: &Option<PathBuf>, spacing: Option<f64>) -> (GridStore, f64) {
    (
        GridStore::new(store.clone().unwrap_or_else(|| config.store_dir.clone())),
        spacing.unwrap_or(config.spacing),
    )
}

/// Load a place catalog from its configured source.
pub fn load_catalog(config: &GridConfig, layer: PlaceLayer) -> Result<PlaceCatalog> {
    let path = config.source_path(layer);
    Ok(PlaceCatalog::load(layer, &path)
        .with_context(|| format!("failed to load {layer} source {}", path.display()))?
        .with_name_policy(config.name_policy))
}

/// Assemble a lookup over the stored grid and both place layers.
pub fn open_lookup(config: &GridConfig, store: &GridStore, spacing: f64) -> Result<GridLookup> {
    let grid = store.read_grid(spacing)
        .with_context(|| format!("no usable grid for spacing {spacing} in {}; run `globegrid build`", store.root().display()))?;

    let mut lookup = GridLookup::new(grid);
    for layer in PlaceLayer::ALL {
        let relations = store.read_relations(spacing, layer)
            .with_context(|| format!("failed to read {layer} relations"))?;
        lookup = lookup.with_index(PlaceIndex::new(load_catalog(config, layer)?, relations)?)?;
    }
    Ok(lookup)
}
