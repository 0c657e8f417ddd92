//! IO module for format-specific reading and writing operations.
//!
//! Each format module handles reading and writing for a specific file format.
//!
//! # Format Modules
//!
//! - `csv` - CSV format for relation tables and long-format gridded data
//! - `geojson` - GeoJSON format for grid cells and place features
//! - `shp` - Shapefile format for country and city layers
//! - `parquet` - Parquet format for long-format gridded data (requires `parquet` feature)
//! - `netcdf` - NetCDF cubes such as the NCEP `*.mon.mean.nc` products (requires `netcdf` feature)
//! - `cftime` - decoding of `<unit> since <date>` time coordinates

pub(crate) mod cftime;
pub(crate) mod csv;
mod geojson;
pub(crate) mod shp;

#[cfg(feature = "netcdf")]
pub(crate) mod netcdf;
#[cfg(feature = "parquet")]
pub(crate) mod parquet;

pub(crate) use geojson::*;
