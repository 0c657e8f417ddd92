use std::{collections::BTreeSet, path::Path};

use ahash::AHashMap;
use polars::{frame::DataFrame, prelude::{col, BooleanChunked, Column, IntoLazy, SortMultipleOptions}};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::{GridError, GridResult}, grid::Grid, io};
use super::dataset::GriddedDataset;

/// Controls how gridded coordinates are matched to cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    /// Fraction of dataset coordinates below which the join is suspicious.
    pub min_match_rate: f64,
    /// Both sides are rounded to multiples of this many degrees before matching.
    pub snap: f64,
    /// Fail with `CoordinateMismatch` instead of logging a warning.
    pub strict: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self { min_match_rate: 0.5, snap: 1e-6, strict: false }
    }
}

/// Gridded rows tagged with the `grid_id` of the cell they are centered on.
#[derive(Debug, Clone)]
pub struct JoinedGrid {
    frame: DataFrame,
    matched: usize,
    total: usize,
    value_columns: Vec<String>,
}

impl JoinedGrid {
    /// Joined rows: `grid_id`, time columns, `lat`, `lon`, then one column per variable.
    #[inline] pub fn frame(&self) -> &DataFrame { &self.frame }

    pub fn into_frame(self) -> DataFrame { self.frame }

    /// Number of dataset (lat, lon) coordinates that matched a cell center.
    #[inline] pub fn matched(&self) -> usize { self.matched }

    /// Number of dataset (lat, lon) coordinates.
    #[inline] pub fn total(&self) -> usize { self.total }

    /// Variable columns carried through the join.
    #[inline] pub fn value_columns(&self) -> &[String] { &self.value_columns }

    pub fn match_rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.matched as f64 / self.total as f64 }
    }

    /// Mean of `value_columns` per `time_key` over `cells`; see [`aggregate_over_cells`].
    pub fn aggregate(&self, value_columns: &[&str], cells: &BTreeSet<u32>, time_key: &str) -> GridResult<DataFrame> {
        aggregate_over_cells(&self.frame, value_columns, cells, time_key)
    }
}

#[inline]
fn snap_key(lon: f64, lat: f64, snap: f64) -> (i64, i64) {
    ((lon / snap).round() as i64, (lat / snap).round() as i64)
}

/// Attach a `grid_id` to every dataset row whose (lat, lon) is a cell center.
///
/// Longitudes must already be in [-180, 180) (see
/// [`GriddedDataset::normalize_longitude`]). Rows that match no cell center
/// are dropped; missing values become nulls.
pub fn join_to_grid(dataset: &GriddedDataset, grid: &Grid, options: &JoinOptions) -> GridResult<JoinedGrid> {
    if !(options.snap > 0.0 && options.snap.is_finite()) {
        return Err(GridError::schema("join options", format!("snap must be positive, got {}", options.snap)));
    }

    let centers = grid.cells().iter()
        .map(|cell| {
            let center = cell.center();
            (snap_key(center.x(), center.y(), options.snap), cell.id())
        })
        .collect::<AHashMap<_, _>>();

    let (points, ids): (Vec<_>, Vec<_>) = dataset.lat().iter().enumerate()
        .flat_map(|(i, &lat)| dataset.lon().iter().enumerate().map(move |(j, &lon)| ((i, j), lon, lat)))
        .filter_map(|(point, lon, lat)| centers.get(&snap_key(lon, lat, options.snap)).map(|&id| (point, id)))
        .unzip();

    let total = dataset.lat().len() * dataset.lon().len();
    let joined = JoinedGrid {
        frame: {
            let steps = dataset.time().len();
            let mut columns = vec![Column::new("grid_id".into(), (0..steps)
                .flat_map(|_| ids.iter().copied())
                .collect::<Vec<u32>>())];
            columns.extend(dataset.long_columns(&points, true));
            DataFrame::new(columns)?
        },
        matched: points.len(),
        total,
        value_columns: dataset.variable_names().into_iter().map(String::from).collect(),
    };

    let rate = joined.match_rate();
    if total > 0 && rate < options.min_match_rate {
        if options.strict {
            return Err(GridError::CoordinateMismatch { matched: joined.matched, total });
        }
        warn!(matched = joined.matched, total, rate, spacing = grid.spacing(), "few dataset coordinates match cell centers");
    }

    info!(matched = joined.matched, total, rows = joined.frame.height(), "joined gridded data to grid");
    Ok(joined)
}

/// Restrict `joined` to `cells`, group by `time_key` and average each value column.
///
/// The result has one row per distinct `time_key` value, sorted ascending.
/// Nulls are skipped by the mean.
pub fn aggregate_over_cells(
    joined: &DataFrame,
    value_columns: &[&str],
    cells: &BTreeSet<u32>,
    time_key: &str,
) -> GridResult<DataFrame> {
    for &name in ["grid_id", time_key].iter().chain(value_columns) {
        if joined.column(name).is_err() {
            return Err(GridError::schema("joined grid", format!("missing column {name}")));
        }
    }

    let mask = joined.column("grid_id")?.u32()?.into_iter()
        .map(|id| id.is_some_and(|id| cells.contains(&id)))
        .collect::<BooleanChunked>();
    let filtered = joined.filter(&mask)?;

    Ok(filtered.lazy()
        .group_by([col(time_key)])
        .agg(value_columns.iter()
            .map(|&c| col(c).mean().alias(c))
            .collect::<Vec<_>>())
        .collect()?
        .sort([time_key], SortMultipleOptions::default())?)
}

/// Write an aggregated series as CSV, replacing `path` atomically.
pub fn write_series_csv(series: &DataFrame, path: &Path) -> GridResult<()> {
    io::csv::write_csv(series, path)
}
