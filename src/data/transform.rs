//! Dataset transforms applied before joining to the grid.
//!
//! Every reduction skips NaN; a reduction over nothing but NaN yields NaN.

use std::collections::BTreeMap;

use ndarray::{s, Array1, Array2, Array3, ArrayView1, Axis};
use tracing::debug;

use crate::error::{GridError, GridResult};
use super::dataset::{missing_variable, GriddedDataset, TimeAxis};

/// Map a longitude in any convention onto [-180, 180).
#[inline]
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Mean of the non-NaN values.
fn nan_mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, count) = values.into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

/// Population standard deviation of the non-NaN values.
fn nan_std(values: ArrayView1<f64>) -> f64 {
    let mean = nan_mean(values.iter());
    if mean.is_nan() {
        return f64::NAN;
    }
    let squares = values.iter().map(|v| (v - mean).powi(2)).collect::<Vec<_>>();
    nan_mean(&squares).sqrt()
}

impl GriddedDataset {
    /// Remap longitudes to [-180, 180) and reorder the lon axis ascending.
    pub fn normalize_longitude(mut self) -> Self {
        let wrapped = self.lon.iter().map(|&lon| wrap_longitude(lon)).collect::<Vec<_>>();
        let mut order = (0..wrapped.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| wrapped[a].total_cmp(&wrapped[b]));

        self.lon = order.iter().map(|&i| wrapped[i]).collect();
        for cube in self.variables.values_mut() {
            *cube = cube.select(Axis(2), &order);
        }
        debug!(lons = self.lon.len(), "normalized longitudes");
        self
    }

    /// Keep only the last `12 * years` time steps.
    pub fn last_years(mut self, years: usize) -> Self {
        let keep = (12 * years).min(self.time.len());
        let start = self.time.len() - keep;
        self.time = match self.time {
            TimeAxis::Dates(dates) => TimeAxis::Dates(dates[start..].to_vec()),
            TimeAxis::Months(months) => TimeAxis::Months(months[start..].to_vec()),
        };
        for cube in self.variables.values_mut() {
            *cube = cube.slice(s![start.., .., ..]).to_owned();
        }
        self
    }

    /// Convert `var` from degrees Celsius to degrees Fahrenheit in place.
    pub fn celsius_to_fahrenheit(mut self, var: &str) -> GridResult<Self> {
        let cube = self.variables.get_mut(var).ok_or_else(|| missing_variable(var))?;
        cube.mapv_inplace(|c| 1.8 * c + 32.0);
        Ok(self)
    }

    /// Add `out` as the speed `sqrt(u^2 + v^2)` of the `u_var` and `v_var` components.
    pub fn windspeed(mut self, u_var: &str, v_var: &str, out: &str) -> GridResult<Self> {
        let u = self.variable(u_var)?;
        let v = self.variable(v_var)?;
        let mut speed = u.clone();
        speed.zip_mut_with(v, |u, &v| *u = u.hypot(v));
        self.insert_variable(out.to_string(), speed)?;
        Ok(self)
    }

    /// Combine datasets over identical axes; later datasets win on name clashes.
    pub fn merge(datasets: impl IntoIterator<Item = GriddedDataset>) -> GridResult<Self> {
        let mut datasets = datasets.into_iter();
        let mut merged = datasets.next()
            .ok_or_else(|| GridError::schema("merge", "no datasets to merge"))?;
        for dataset in datasets {
            if dataset.lat != merged.lat || dataset.lon != merged.lon || dataset.time != merged.time {
                return Err(GridError::schema("merge", "datasets do not share lat, lon and time axes"));
            }
            merged.variables.extend(dataset.variables);
        }
        Ok(merged)
    }

    /// Group time steps by calendar month and reduce each of `vars` to
    /// `<var>_avg` and `<var>_std`. The result has a monthly time axis.
    pub fn monthly_stats(&self, vars: &[&str]) -> GridResult<Self> {
        let mut groups = BTreeMap::<u32, Vec<usize>>::new();
        for t in 0..self.time.len() {
            groups.entry(self.time.month(t)).or_default().push(t);
        }

        let months = groups.keys().copied().collect::<Vec<_>>();
        let mut result = GriddedDataset::new(self.lat.clone(), self.lon.clone(), TimeAxis::Months(months));
        let (_, nlat, nlon) = self.shape();

        for &var in vars {
            let cube = self.variable(var)?;
            let mut avg = Array3::from_elem((groups.len(), nlat, nlon), f64::NAN);
            let mut std = avg.clone();
            for (g, steps) in groups.values().enumerate() {
                let subset = cube.select(Axis(0), steps);
                for i in 0..nlat {
                    for j in 0..nlon {
                        let series = subset.slice(s![.., i, j]);
                        avg[[g, i, j]] = nan_mean(series.iter());
                        std[[g, i, j]] = nan_std(series);
                    }
                }
            }
            result.insert_variable(format!("{var}_avg"), avg)?;
            result.insert_variable(format!("{var}_std"), std)?;
        }
        Ok(result)
    }

    /// Mean of `var` over all time steps, shaped (lat, lon).
    pub fn time_average(&self, var: &str) -> GridResult<Array2<f64>> {
        let cube = self.variable(var)?;
        Ok(Array2::from_shape_fn((self.lat.len(), self.lon.len()), |(i, j)| {
            nan_mean(cube.slice(s![.., i, j]).iter())
        }))
    }

    /// Unweighted mean of `var` over every lat/lon point, one value per time step.
    pub fn global_average(&self, var: &str) -> GridResult<Array1<f64>> {
        let cube = self.variable(var)?;
        Ok(cube.outer_iter().map(|plane| nan_mean(plane.iter())).collect())
    }

    /// Bilinear interpolation of `var` at (`lon`, `lat`), one value per time step.
    ///
    /// Axes may be ascending or descending. Points outside the axes give NaN.
    pub fn interpolate(&self, var: &str, lon: f64, lat: f64) -> GridResult<Array1<f64>> {
        let cube = self.variable(var)?;
        let nan = || Array1::from_elem(self.time.len(), f64::NAN);

        let (Some((i0, i1, wy)), Some((j0, j1, wx))) = (bracket(&self.lat, lat), bracket(&self.lon, lon)) else {
            return Ok(nan());
        };

        Ok(cube.outer_iter().map(|plane| {
            let (a, b, c, d) = (plane[[i0, j0]], plane[[i0, j1]], plane[[i1, j0]], plane[[i1, j1]]);
            let south = a + (b - a) * wx;
            let north = c + (d - c) * wx;
            south + (north - south) * wy
        }).collect())
    }
}

/// Neighbouring indices around `x` on a monotonic axis and the weight of the second.
fn bracket(axis: &[f64], x: f64) -> Option<(usize, usize, f64)> {
    if axis.is_empty() || !x.is_finite() {
        return None;
    }
    if axis.len() == 1 {
        return (axis[0] == x).then_some((0, 0, 0.0));
    }
    axis.windows(2).enumerate().find_map(|(k, pair)| {
        let (lo, hi) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
        if x < lo || x > hi {
            return None;
        }
        let w = if pair[1] == pair[0] { 0.0 } else { (x - pair[0]) / (pair[1] - pair[0]) };
        Some((k, k + 1, w))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn dates(ym: &[(i32, u32)]) -> TimeAxis {
        TimeAxis::Dates(ym.iter().map(|&(y, m)| NaiveDate::from_ymd_opt(y, m, 1).unwrap()).collect())
    }

    #[test]
    fn wrap_longitude_maps_to_half_open_range() {
        assert_eq!(wrap_longitude(350.0), -10.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
    }

    #[test]
    fn normalized_longitudes_sort_ascending() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0, 10.0, 350.0], dates(&[(2020, 1)]))
            .with_variable("air", array![[[1.0, 2.0, 3.0]]]).unwrap()
            .normalize_longitude();

        assert_eq!(ds.lon(), &[-10.0, 0.0, 10.0]);
        assert_eq!(ds.variable("air").unwrap(), &array![[[3.0, 1.0, 2.0]]]);
    }

    #[test]
    fn fahrenheit_conversion() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0, 1.0], dates(&[(2020, 1)]))
            .with_variable("air", array![[[0.0, 100.0]]]).unwrap()
            .celsius_to_fahrenheit("air").unwrap();
        assert_eq!(ds.variable("air").unwrap(), &array![[[32.0, 212.0]]]);
    }

    #[test]
    fn missing_variable_is_a_schema_mismatch() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0], dates(&[(2020, 1)]));
        assert!(matches!(ds.celsius_to_fahrenheit("air"), Err(GridError::SchemaMismatch { .. })));
    }

    #[test]
    fn windspeed_is_vector_magnitude() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0], dates(&[(2020, 1)]))
            .with_variable("uwnd", array![[[3.0]]]).unwrap()
            .with_variable("vwnd", array![[[4.0]]]).unwrap()
            .windspeed("uwnd", "vwnd", "wind").unwrap();
        assert_eq!(ds.variable("wind").unwrap()[[0, 0, 0]], 5.0);
    }

    #[test]
    fn monthly_stats_group_across_years() {
        let ds = GriddedDataset::new(vec![0.0], vec![0.0], dates(&[(2019, 1), (2019, 2), (2020, 1), (2020, 2)]))
            .with_variable("air", array![[[1.0]], [[10.0]], [[3.0]], [[f64::NAN]]]).unwrap();
        let stats = ds.monthly_stats(&["air"]).unwrap();

        assert_eq!(stats.time(), &TimeAxis::Months(vec![1, 2]));
        assert_eq!(stats.variable_names(), vec!["air_avg", "air_std"]);
        assert_eq!(stats.variable("air_avg").unwrap().as_slice().unwrap(), &[2.0, 10.0]);
        assert_eq!(stats.variable("air_std").unwrap().as_slice().unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn last_years_keeps_trailing_steps() {
        let months = (1..=12).map(|m| (2019, m)).chain((1..=12).map(|m| (2020, m))).collect::<Vec<_>>();
        let values = Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64);
        let ds = GriddedDataset::new(vec![0.0], vec![0.0], dates(&months))
            .with_variable("air", values).unwrap()
            .last_years(1);

        assert_eq!(ds.time().len(), 12);
        assert_eq!(ds.variable("air").unwrap()[[0, 0, 0]], 12.0);
        assert_eq!(ds.clone().last_years(5).time().len(), 12);
    }

    #[test]
    fn averages_skip_missing_values() {
        let ds = GriddedDataset::new(vec![0.0, 1.0], vec![0.0], dates(&[(2020, 1), (2020, 2)]))
            .with_variable("air", array![[[1.0], [f64::NAN]], [[3.0], [5.0]]]).unwrap();

        assert_eq!(ds.time_average("air").unwrap(), array![[2.0], [5.0]]);
        assert_eq!(ds.global_average("air").unwrap(), array![1.0, 4.0]);
    }

    #[test]
    fn bilinear_interpolation_on_descending_latitudes() {
        let ds = GriddedDataset::new(vec![10.0, 0.0], vec![0.0, 10.0], dates(&[(2020, 1)]))
            .with_variable("air", array![[[2.0, 4.0], [0.0, 2.0]]]).unwrap();

        assert_eq!(ds.interpolate("air", 5.0, 5.0).unwrap()[0], 2.0);
        assert_eq!(ds.interpolate("air", 0.0, 10.0).unwrap()[0], 2.0);
        assert_eq!(ds.interpolate("air", 10.0, 0.0).unwrap()[0], 2.0);
        assert_eq!(ds.interpolate("air", 10.0, 10.0).unwrap()[0], 4.0);
        assert!(ds.interpolate("air", 20.0, 5.0).unwrap()[0].is_nan());
    }

    #[test]
    fn merge_requires_matching_axes() {
        let a = GriddedDataset::new(vec![0.0], vec![0.0], dates(&[(2020, 1)]))
            .with_variable("uwnd", array![[[1.0]]]).unwrap();
        let b = GriddedDataset::new(vec![0.0], vec![0.0], dates(&[(2020, 1)]))
            .with_variable("vwnd", array![[[2.0]]]).unwrap();
        let c = GriddedDataset::new(vec![1.0], vec![0.0], dates(&[(2020, 1)]));

        let merged = GriddedDataset::merge([a.clone(), b]).unwrap();
        assert_eq!(merged.variable_names(), vec!["uwnd", "vwnd"]);
        assert!(GriddedDataset::merge([a, c]).is_err());
        assert!(GriddedDataset::merge(Vec::new()).is_err());
    }
}
