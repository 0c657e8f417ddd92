use std::{cmp::Ordering, collections::BTreeMap, path::Path};

use chrono::{Datelike, NaiveDate};
use ndarray::{Array3, Axis};
use polars::{frame::DataFrame, prelude::{Column, DataType}};
use tracing::{debug, info};

use crate::{error::{GridError, GridResult}, io};

/// Columns that describe where and when a row is, never a variable.
const RESERVED_COLUMNS: [&str; 6] = ["time", "lat", "lon", "year", "month", "grid_id"];

/// Time coordinate of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    /// One calendar date per step (monthly means are dated on the first of the month).
    Dates(Vec<NaiveDate>),
    /// Calendar months 1..=12, produced by monthly aggregation.
    Months(Vec<u32>),
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Dates(dates) => dates.len(),
            TimeAxis::Months(months) => months.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Calendar month (1..=12) of step `t`.
    pub fn month(&self, t: usize) -> u32 {
        match self {
            TimeAxis::Dates(dates) => dates[t].month(),
            TimeAxis::Months(months) => months[t],
        }
    }
}

/// A set of variables sharing one (time, lat, lon) cube.
///
/// Each variable is an `Array3` indexed `[time, lat, lon]`; missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedDataset {
    pub(super) lat: Vec<f64>,
    pub(super) lon: Vec<f64>,
    pub(super) time: TimeAxis,
    pub(super) variables: BTreeMap<String, Array3<f64>>,
}

impl GriddedDataset {
    /// Empty dataset over the given axes.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>, time: TimeAxis) -> Self {
        Self { lat, lon, time, variables: BTreeMap::new() }
    }

    /// Add (or replace) a variable; its shape must be `(time, lat, lon)`.
    pub fn with_variable(mut self, name: impl Into<String>, values: Array3<f64>) -> GridResult<Self> {
        self.insert_variable(name.into(), values)?;
        Ok(self)
    }

    pub(super) fn insert_variable(&mut self, name: String, values: Array3<f64>) -> GridResult<()> {
        if values.dim() != self.shape() {
            return Err(GridError::schema(
                format!("variable {name}"),
                format!("shape {:?} does not match dataset axes {:?}", values.dim(), self.shape()),
            ));
        }
        self.variables.insert(name, values);
        Ok(())
    }

    #[inline] pub fn lat(&self) -> &[f64] { &self.lat }

    #[inline] pub fn lon(&self) -> &[f64] { &self.lon }

    #[inline] pub fn time(&self) -> &TimeAxis { &self.time }

    /// Axis lengths as (time, lat, lon).
    #[inline] pub fn shape(&self) -> (usize, usize, usize) { (self.time.len(), self.lat.len(), self.lon.len()) }

    /// Variable names in sorted order.
    pub fn variable_names(&self) -> Vec<&str> { self.variables.keys().map(String::as_str).collect() }

    /// Values of `name`, or `SchemaMismatch` if the dataset lacks it.
    pub fn variable(&self, name: &str) -> GridResult<&Array3<f64>> {
        self.variables.get(name).ok_or_else(|| missing_variable(name))
    }

    /// Read a long-format CSV table (`time,lat,lon,<variables...>`).
    pub fn read_csv(path: &Path) -> GridResult<Self> {
        let df = io::csv::read_csv(path)?;
        Self::from_long_frame(&df, &path.display().to_string())
    }

    /// Read a long-format Parquet table.
    #[cfg(feature = "parquet")]
    pub fn read_parquet(path: &Path) -> GridResult<Self> {
        let df = io::parquet::read_parquet(path)?;
        Self::from_long_frame(&df, &path.display().to_string())
    }

    /// Read a NetCDF file, keeping every `(time, lat, lon)` variable.
    #[cfg(feature = "netcdf")]
    pub fn read_netcdf(path: &Path) -> GridResult<Self> {
        let cube = io::netcdf::read_netcdf(path)?;
        Self::from_raw_cube(cube.lat, cube.lon, TimeAxis::Dates(cube.time), cube.variables, &path.display().to_string())
    }

    /// Read a CSV, Parquet or NetCDF file by extension; the latter two need their features.
    pub fn read(path: &Path) -> GridResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "netcdf")]
            Some("nc") => Self::read_netcdf(path),
            #[cfg(feature = "parquet")]
            Some("parquet") => Self::read_parquet(path),
            Some("csv") => Self::read_csv(path),
            _ => Err(GridError::schema(path.display().to_string(), "unsupported gridded data format")),
        }
    }

    /// Build a dataset from row-major `[time, lat, lon]` values in file axis order.
    ///
    /// Latitude and longitude are reordered ascending (NCEP files run north to south).
    #[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
    pub(crate) fn from_raw_cube(
        lat: Vec<f64>,
        lon: Vec<f64>,
        time: TimeAxis,
        variables: Vec<(String, Vec<f64>)>,
        origin: &str,
    ) -> GridResult<Self> {
        let lat_order = ascending_order(&lat);
        let lon_order = ascending_order(&lon);
        let mut dataset = Self::new(
            lat_order.iter().map(|&i| lat[i]).collect(),
            lon_order.iter().map(|&j| lon[j]).collect(),
            time,
        );
        let shape = dataset.shape();

        for (name, values) in variables {
            let cube = Array3::from_shape_vec(shape, values)
                .map_err(|_| GridError::schema(origin, format!("variable {name} does not match axes {shape:?}")))?
                .select(Axis(1), &lat_order)
                .select(Axis(2), &lon_order);
            dataset.insert_variable(name, cube)?;
        }
        info!(
            origin,
            times = shape.0,
            lats = shape.1,
            lons = shape.2,
            variables = ?dataset.variable_names(),
            "loaded gridded dataset"
        );
        Ok(dataset)
    }

    /// Pivot a long table into cubes.
    ///
    /// Requires `lat`, `lon` and either `time` (dates, `YYYY-MM-DD` prefix) or
    /// `month` (1..=12). Every other numeric column becomes a variable. Axes
    /// are sorted ascending; cube positions with no row are NaN.
    pub fn from_long_frame(df: &DataFrame, origin: &str) -> GridResult<Self> {
        let lat_values = float_column(df, "lat", origin)?;
        let lon_values = float_column(df, "lon", origin)?;

        let (time, time_index) = if has_column(df, "time") {
            let dates = date_column(df, "time", origin)?;
            let axis = sorted_unique(dates.clone());
            let index = dates.iter()
                .map(|date| axis.binary_search(date).unwrap_or_default())
                .collect::<Vec<_>>();
            (TimeAxis::Dates(axis), index)
        } else if has_column(df, "month") {
            let months = month_column(df, "month", origin)?;
            let axis = sorted_unique(months.clone());
            let index = months.iter()
                .map(|month| axis.binary_search(month).unwrap_or_default())
                .collect::<Vec<_>>();
            (TimeAxis::Months(axis), index)
        } else {
            return Err(GridError::schema(origin, "missing column time"));
        };

        let lat = sorted_unique_f64(&lat_values);
        let lon = sorted_unique_f64(&lon_values);
        let lat_index = lat_values.iter().map(|v| position(&lat, *v)).collect::<Vec<_>>();
        let lon_index = lon_values.iter().map(|v| position(&lon, *v)).collect::<Vec<_>>();

        let mut dataset = Self::new(lat, lon, time);
        let shape = dataset.shape();

        for name in df.get_column_names() {
            if RESERVED_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            let values = float_column(df, name.as_str(), origin)?;
            let mut cube = Array3::from_elem(shape, f64::NAN);
            for (row, value) in values.into_iter().enumerate() {
                cube[[time_index[row], lat_index[row], lon_index[row]]] = value;
            }
            dataset.insert_variable(name.to_string(), cube)?;
        }

        if dataset.variables.is_empty() {
            return Err(GridError::schema(origin, "no variable columns"));
        }
        info!(
            origin,
            times = shape.0,
            lats = shape.1,
            lons = shape.2,
            variables = ?dataset.variable_names(),
            "loaded gridded dataset"
        );
        Ok(dataset)
    }

    /// Flatten to one row per (time, lat, lon), in that order.
    ///
    /// Dated axes produce `time` (ISO date), `year` and `month` columns;
    /// monthly axes produce `month` only. Variable values keep NaN for missing.
    pub fn to_long_frame(&self) -> GridResult<DataFrame> {
        let points = (0..self.lat.len())
            .flat_map(|i| (0..self.lon.len()).map(move |j| (i, j)))
            .collect::<Vec<_>>();
        Ok(DataFrame::new(self.long_columns(&points, false))?)
    }

    /// Long-format columns restricted to the (lat index, lon index) `points`.
    ///
    /// Rows run over time steps, then `points` in the given order. With
    /// `nan_as_null`, missing variable values become nulls.
    pub(super) fn long_columns(&self, points: &[(usize, usize)], nan_as_null: bool) -> Vec<Column> {
        let per_step = points.len();
        let mut columns = Vec::new();

        match &self.time {
            TimeAxis::Dates(dates) => {
                let repeat = |f: &dyn Fn(&NaiveDate) -> i32| dates.iter()
                    .flat_map(|date| std::iter::repeat_n(f(date), per_step))
                    .collect::<Vec<_>>();
                columns.push(Column::new("time".into(), dates.iter()
                    .flat_map(|date| std::iter::repeat_n(date.format("%Y-%m-%d").to_string(), per_step))
                    .collect::<Vec<_>>()));
                columns.push(Column::new("year".into(), repeat(&|date| date.year())));
                columns.push(Column::new("month".into(), repeat(&|date| date.month() as i32)));
            }
            TimeAxis::Months(months) => {
                columns.push(Column::new("month".into(), months.iter()
                    .flat_map(|&month| std::iter::repeat_n(month as i32, per_step))
                    .collect::<Vec<_>>()));
            }
        }

        let steps = self.time.len();
        columns.push(Column::new("lat".into(), (0..steps)
            .flat_map(|_| points.iter().map(|&(i, _)| self.lat[i]))
            .collect::<Vec<_>>()));
        columns.push(Column::new("lon".into(), (0..steps)
            .flat_map(|_| points.iter().map(|&(_, j)| self.lon[j]))
            .collect::<Vec<_>>()));

        for (name, cube) in &self.variables {
            let values = (0..steps).flat_map(|t| points.iter().map(move |&(i, j)| cube[[t, i, j]]));
            columns.push(if nan_as_null {
                Column::new(name.as_str().into(), values.map(|v| (!v.is_nan()).then_some(v)).collect::<Vec<_>>())
            } else {
                Column::new(name.as_str().into(), values.collect::<Vec<_>>())
            });
        }

        debug!(rows = steps * per_step, variables = self.variables.len(), "flattened gridded dataset");
        columns
    }
}

pub(super) fn missing_variable(name: &str) -> GridError {
    GridError::schema("gridded dataset", format!("missing variable {name}"))
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|column| column.as_str() == name)
}

/// Read a column as f64; nulls become NaN.
fn float_column(df: &DataFrame, name: &str, origin: &str) -> GridResult<Vec<f64>> {
    let column = df.column(name)
        .map_err(|_| GridError::schema(origin, format!("missing column {name}")))?;
    let column = column.cast(&DataType::Float64)
        .map_err(|_| GridError::schema(origin, format!("column {name} is not numeric")))?;
    Ok(column.f64()?.into_iter().map(|value| value.unwrap_or(f64::NAN)).collect())
}

fn date_column(df: &DataFrame, name: &str, origin: &str) -> GridResult<Vec<NaiveDate>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    column.str()?.into_iter()
        .enumerate()
        .map(|(row, value)| {
            let text = value.ok_or_else(|| GridError::schema(origin, format!("null {name} at row {row}")))?;
            let prefix = text.get(..10).unwrap_or(text);
            NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
                .map_err(|_| GridError::schema(origin, format!("unparseable {name} {text:?} at row {row}")))
        })
        .collect()
}

fn month_column(df: &DataFrame, name: &str, origin: &str) -> GridResult<Vec<u32>> {
    let column = df.column(name)?.cast(&DataType::Int64)
        .map_err(|_| GridError::schema(origin, format!("column {name} is not integral")))?;
    column.i64()?.into_iter()
        .enumerate()
        .map(|(row, value)| value
            .filter(|month| (1..=12).contains(month))
            .map(|month| month as u32)
            .ok_or_else(|| GridError::schema(origin, format!("invalid {name} at row {row}"))))
        .collect()
}

fn sorted_unique<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort_unstable();
    values.dedup();
    values
}

fn sorted_unique_f64(values: &[f64]) -> Vec<f64> {
    let mut axis = values.to_vec();
    axis.sort_unstable_by(f64::total_cmp);
    axis.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    axis
}

/// Indices that sort `axis` ascending.
fn ascending_order(axis: &[f64]) -> Vec<usize> {
    let mut order = (0..axis.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| axis[a].total_cmp(&axis[b]));
    order
}

/// Index of `value` in a sorted axis built from the same values.
fn position(axis: &[f64], value: f64) -> usize {
    axis.binary_search_by(|probe| probe.total_cmp(&value)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn long_csv() -> &'static str {
        "time,lat,lon,air\n\
         2020-02-01,0.0,10.0,4.0\n\
         2020-01-01,0.0,10.0,1.0\n\
         2020-01-01,0.0,0.0,2.0\n\
         2020-01-01,5.0,0.0,3.0\n"
    }

    #[test]
    fn pivots_long_rows_into_sorted_axes() {
        let df = io::csv::read_csv_bytes(long_csv().as_bytes()).unwrap();
        let ds = GriddedDataset::from_long_frame(&df, "test").unwrap();

        assert_eq!(ds.lat(), &[0.0, 5.0]);
        assert_eq!(ds.lon(), &[0.0, 10.0]);
        assert_eq!(ds.time(), &TimeAxis::Dates(vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        ]));

        let air = ds.variable("air").unwrap();
        assert_eq!(air[[0, 0, 0]], 2.0);
        assert_eq!(air[[0, 0, 1]], 1.0);
        assert_eq!(air[[1, 0, 1]], 4.0);
        assert!(air[[1, 1, 0]].is_nan());
    }

    #[test]
    fn timestamps_keep_their_date() {
        let df = io::csv::read_csv_bytes(b"time,lat,lon,slp\n1948-01-01 00:00:00,0,0,1013.2\n").unwrap();
        let ds = GriddedDataset::from_long_frame(&df, "test").unwrap();
        assert_eq!(ds.time(), &TimeAxis::Dates(vec![NaiveDate::from_ymd_opt(1948, 1, 1).unwrap()]));
    }

    #[test]
    fn missing_axes_are_schema_mismatches() {
        for csv in ["lat,lon,air\n0,0,1\n", "time,lon,air\n2020-01-01,0,1\n", "time,lat,air\n2020-01-01,0,1\n"] {
            let df = io::csv::read_csv_bytes(csv.as_bytes()).unwrap();
            assert!(matches!(GriddedDataset::from_long_frame(&df, "test"), Err(GridError::SchemaMismatch { .. })));
        }
    }

    #[test]
    fn raw_cubes_are_reordered_south_to_north() {
        let time = TimeAxis::Dates(vec![NaiveDate::from_ymd_opt(1948, 1, 1).unwrap()]);
        // Two latitudes stored north first, three longitudes ascending.
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ds = GriddedDataset::from_raw_cube(
            vec![90.0, -90.0], vec![0.0, 120.0, 240.0], time, vec![("air".to_string(), values)], "test",
        ).unwrap();

        assert_eq!(ds.lat(), &[-90.0, 90.0]);
        let air = ds.variable("air").unwrap();
        assert_eq!(air[[0, 0, 0]], 4.0);
        assert_eq!(air[[0, 1, 2]], 3.0);

        let short = GriddedDataset::from_raw_cube(
            vec![0.0], vec![0.0], TimeAxis::Months(vec![1]), vec![("air".to_string(), vec![1.0, 2.0])], "test",
        );
        assert!(matches!(short, Err(GridError::SchemaMismatch { .. })));
    }

    #[test]
    fn shape_is_checked_on_insert() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0, 1.0], TimeAxis::Months(vec![1]));
        assert!(ds.clone().with_variable("air", array![[[1.0, 2.0]]]).is_ok());
        assert!(ds.with_variable("air", array![[[1.0]]]).is_err());
    }

    #[test]
    fn long_frame_round_trip() {
        let df = io::csv::read_csv_bytes(long_csv().as_bytes()).unwrap();
        let ds = GriddedDataset::from_long_frame(&df, "test").unwrap();

        let flat = ds.to_long_frame().unwrap();
        assert_eq!(flat.height(), 8);
        assert_eq!(
            flat.get_column_names().iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            vec!["time", "year", "month", "lat", "lon", "air"]
        );

        let bytes = io::csv::write_csv_bytes(&flat).unwrap();
        let again = GriddedDataset::from_long_frame(&io::csv::read_csv_bytes(&bytes).unwrap(), "again").unwrap();
        assert_eq!(again.lat(), ds.lat());
        assert_eq!(again.time(), ds.time());
        assert_eq!(again.variable("air").unwrap()[[0, 0, 0]], 2.0);
    }
}
