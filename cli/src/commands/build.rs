use anyhow::{Context, Result};
use globegrid::{Grid, PlaceLayer, SpatialJoin};
use tracing::info;

use super::{load_catalog, load_config, store_and_spacing};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BuildArgs) -> Result<()> {
    let config = load_config(cli)?;
    let (store, spacing) = store_and_spacing(&config, &args.store, args.spacing);

    let grid = Grid::build(spacing)?;
    store.write_grid(&grid).context("failed to store grid")?;

    let join = SpatialJoin::new(config.predicate);
    for layer in PlaceLayer::ALL {
        let catalog = load_catalog(&config, layer)?;
        let relations = join.intersect(&grid, &catalog);
        let path = store.write_relations(spacing, &relations)
            .with_context(|| format!("failed to store {layer} relations"))?;
        info!(%layer, places = catalog.len(), relations = relations.len(), "joined layer");
        println!("[build] {layer}: {} relations -> {}", relations.len(), path.display());
    }

    println!("[build] grid of {} cells -> {}", grid.len(), store.grid_path(spacing).display());
    Ok(())
}
