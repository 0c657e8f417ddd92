//! NetCDF reading operations.
//!
//! This module is only available when the `netcdf` feature is enabled and
//! needs the system `libnetcdf`.

use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::{common, error::{GridError, GridResult}};
use super::cftime::decode_time;

/// (time, lat, lon) variables of one NetCDF file, in the file's axis order.
pub(crate) struct NetCdfCube {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub time: Vec<NaiveDate>,
    /// Row-major `[time, lat, lon]` values per variable; fill values are NaN.
    pub variables: Vec<(String, Vec<f64>)>,
}

/// Read every variable dimensioned exactly `(time, lat, lon)` from `path`.
///
/// Packed values are unpacked with `scale_factor`/`add_offset`; `_FillValue`
/// and `missing_value` become NaN.
pub(crate) fn read_netcdf(path: &Path) -> GridResult<NetCdfCube> {
    common::require_file_exists(path)?;
    let origin = path.display().to_string();
    let file = ::netcdf::open(path)
        .map_err(|e| GridError::schema(&origin, format!("failed to open NetCDF: {e}")))?;

    let lat = values(&file, "lat", &origin)?;
    let lon = values(&file, "lon", &origin)?;

    let time_var = file.variable("time")
        .ok_or_else(|| GridError::schema(&origin, "missing variable time"))?;
    let units = string_attr(&time_var, "units")
        .ok_or_else(|| GridError::schema(&origin, "time has no units attribute"))?;
    let offsets: Vec<f64> = time_var.get_values(..)
        .map_err(|e| GridError::schema(&origin, format!("failed to read time: {e}")))?;
    let time = decode_time(&offsets, &units).map_err(|detail| GridError::schema(&origin, detail))?;

    let mut variables = Vec::new();
    for var in file.variables() {
        let dims = var.dimensions().iter().map(|dim| dim.name()).collect::<Vec<_>>();
        if dims != ["time", "lat", "lon"] {
            continue;
        }
        let name = var.name();
        let raw: Vec<f64> = var.get_values(..)
            .map_err(|e| GridError::schema(&origin, format!("failed to read {name}: {e}")))?;

        let scale = f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fills = [f64_attr(&var, "_FillValue"), f64_attr(&var, "missing_value")];
        let unpacked = raw.into_iter()
            .map(|value| if fills.contains(&Some(value)) { f64::NAN } else { value * scale + offset })
            .collect();

        debug!(origin, variable = %name, "read NetCDF variable");
        variables.push((name, unpacked));
    }

    if variables.is_empty() {
        return Err(GridError::schema(&origin, "no variable with dimensions (time, lat, lon)"));
    }
    Ok(NetCdfCube { lat, lon, time, variables })
}

/// Values of a one-dimensional coordinate variable.
fn values(file: &::netcdf::File, name: &str, origin: &str) -> GridResult<Vec<f64>> {
    let var = file.variable(name)
        .ok_or_else(|| GridError::schema(origin, format!("missing variable {name}")))?;
    var.get_values(..)
        .map_err(|e| GridError::schema(origin, format!("failed to read {name}: {e}")))
}

/// Check if a variable has an attribute with the given name.
fn has_attr(var: &::netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn f64_attr(var: &::netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    f64::try_from(var.attribute_value(name)?.ok()?).ok()
}

fn string_attr(var: &::netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        ::netcdf::AttributeValue::Str(text) => Some(text),
        _ => None,
    }
}
