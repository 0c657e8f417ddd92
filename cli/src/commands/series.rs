use anyhow::{Context, Result};
use globegrid::{join_to_grid, variable, write_series_csv, DatasetProvider, GriddedDataset, LocalDirProvider};
use tracing::info;

use super::{load_config, open_lookup, store_and_spacing};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::SeriesArgs) -> Result<()> {
    let config = load_config(cli)?;
    let spec = variable(&args.variable)
        .with_context(|| format!("unknown variable {:?}; see `globegrid variables`", args.variable))?;
    let (store, spacing) = store_and_spacing(&config, &args.store, args.spacing);
    let lookup = open_lookup(&config, &store, spacing)?;

    let cells = match (&args.country, &args.city) {
        (Some(country), _) => lookup.cells_for_country(country)?,
        (None, Some(city)) => lookup.cells_for_city(city, args.city_country.as_deref())?,
        (None, None) => anyhow::bail!("one of --country or --city is required"),
    };

    let path = LocalDirProvider::new(&config.data_dir).fetch(spec.key)?;
    let mut dataset = GriddedDataset::read(&path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .normalize_longitude();

    if let Some(years) = args.last_years {
        dataset = dataset.last_years(years);
    }
    if args.fahrenheit {
        dataset = dataset.celsius_to_fahrenheit(spec.column)?;
    }

    let (dataset, value_columns, default_key) = if args.monthly {
        let stats = dataset.monthly_stats(&[spec.column])?;
        let columns = vec![format!("{}_avg", spec.column), format!("{}_std", spec.column)];
        (stats, columns, "month")
    } else {
        (dataset, vec![spec.column.to_string()], "time")
    };
    let time_key = args.time_key.as_deref().unwrap_or(default_key);

    let joined = join_to_grid(&dataset, lookup.grid(), &config.join_options())?;
    let columns = value_columns.iter().map(String::as_str).collect::<Vec<_>>();
    let series = joined.aggregate(&columns, &cells, time_key)?;

    write_series_csv(&series, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(cells = cells.len(), rows = series.height(), "wrote series");
    println!("[series] {} rows over {} cells -> {}", series.height(), cells.len(), args.output.display());
    Ok(())
}
