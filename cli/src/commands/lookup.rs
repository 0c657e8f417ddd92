use std::collections::BTreeSet;

use anyhow::Result;
use globegrid::PlaceLayer;

use crate::cli::LookupTarget;
use super::{load_config, open_lookup, store_and_spacing};

fn print_cells(cells: &BTreeSet<u32>) {
    let ids = cells.iter().map(u32::to_string).collect::<Vec<_>>();
    println!("{}", ids.join(","));
}

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::LookupArgs) -> Result<()> {
    let config = load_config(cli)?;
    let (store, spacing) = store_and_spacing(&config, &args.store, args.spacing);
    let lookup = open_lookup(&config, &store, spacing)?;

    match &args.target {
        LookupTarget::Country { name } => print_cells(&lookup.cells_for_country(name)?),
        LookupTarget::City { name, country } => print_cells(&lookup.cells_for_city(name, country.as_deref())?),
        LookupTarget::Point { lon, lat } => {
            println!("grid_id: {}", lookup.cell_for_point(*lon, *lat)?);
            for layer in PlaceLayer::ALL {
                let names = lookup.places_at_point(layer, *lon, *lat)?.into_iter()
                    .map(|feature| feature.name.as_str())
                    .collect::<Vec<_>>();
                println!("{layer}: {}", names.join(", "));
            }
        }
    }
    Ok(())
}
