use geo::{Coord, LineString, Point, Polygon, Rect};

/// One rectangle of the uniform lat/lon tiling.
///
/// Cells are identified by their row-major position: latitude is the slow axis
/// (ascending from -90) and longitude the fast axis (ascending from -180).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    id: u32,
    lon_min: f64,
    lat_min: f64,
    lon_max: f64,
    lat_max: f64,
}

impl GridCell {
    /// Construct the cell at (`lat_idx`, `lon_idx`) of a grid with `num_lon` columns.
    pub(crate) fn new(lat_idx: usize, lon_idx: usize, num_lon: usize, spacing: f64) -> Self {
        Self {
            id: (lat_idx * num_lon + lon_idx) as u32,
            lon_min: -180.0 + lon_idx as f64 * spacing,
            lat_min: -90.0 + lat_idx as f64 * spacing,
            // Edges come from the neighbouring index so adjacent cells share them exactly.
            lon_max: -180.0 + (lon_idx + 1) as f64 * spacing,
            lat_max: -90.0 + (lat_idx + 1) as f64 * spacing,
        }
    }

    /// Row-major cell identifier.
    #[inline] pub fn id(&self) -> u32 { self.id }

    /// Western edge, in degrees.
    #[inline] pub fn lon_min(&self) -> f64 { self.lon_min }

    /// Southern edge, in degrees.
    #[inline] pub fn lat_min(&self) -> f64 { self.lat_min }

    /// Eastern edge, in degrees.
    #[inline] pub fn lon_max(&self) -> f64 { self.lon_max }

    /// Northern edge, in degrees.
    #[inline] pub fn lat_max(&self) -> f64 { self.lat_max }

    /// Axis-aligned bounds of the cell.
    #[inline]
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.lon_min, y: self.lat_min },
            Coord { x: self.lon_max, y: self.lat_max },
        )
    }

    /// The cell as a closed polygon, starting at the south-west corner and running counter-clockwise.
    pub fn polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.lon_min, self.lat_min),
                (self.lon_max, self.lat_min),
                (self.lon_max, self.lat_max),
                (self.lon_min, self.lat_max),
            ]),
            vec![],
        )
    }

    /// Center point (lon, lat) of the cell.
    #[inline]
    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.lon_min + self.lon_max) / 2.0,
            (self.lat_min + self.lat_max) / 2.0,
        )
    }

    /// True if (lon, lat) lies in the cell or on its boundary.
    #[inline]
    pub fn touches_point(&self, lon: f64, lat: f64) -> bool {
        self.lon_min <= lon && lon <= self.lon_max && self.lat_min <= lat && lat <= self.lat_max
    }

    /// True if (lon, lat) lies in the half-open cell `[lon_min, lon_max) x [lat_min, lat_max)`.
    #[inline]
    pub fn owns_point(&self, lon: f64, lat: f64) -> bool {
        self.lon_min <= lon && lon < self.lon_max && self.lat_min <= lat && lat < self.lat_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cell_of_ten_degree_grid() {
        let cell = GridCell::new(0, 0, 36, 10.0);
        assert_eq!(cell.id(), 0);
        assert_eq!(cell.rect().min(), Coord { x: -180.0, y: -90.0 });
        assert_eq!(cell.rect().max(), Coord { x: -170.0, y: -80.0 });
        assert_eq!(cell.center(), Point::new(-175.0, -85.0));
    }

    #[test]
    fn polygon_corners_follow_sw_se_ne_nw() {
        let cell = GridCell::new(1, 2, 36, 10.0);
        assert_eq!(cell.id(), 38);

        let coords: Vec<_> = cell.polygon().exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![
            (-160.0, -80.0),
            (-150.0, -80.0),
            (-150.0, -70.0),
            (-160.0, -70.0),
            (-160.0, -80.0), // closed
        ]);
    }

    #[test]
    fn boundary_counts_as_touching() {
        let cell = GridCell::new(0, 0, 36, 10.0);
        assert!(cell.touches_point(-170.0, -85.0));
        assert!(cell.touches_point(-180.0, -90.0));
        assert!(!cell.touches_point(-169.9, -85.0));
    }

    #[test]
    fn ownership_excludes_east_and_north_edges() {
        let cell = GridCell::new(0, 0, 36, 10.0);
        assert!(cell.owns_point(-180.0, -90.0));
        assert!(cell.owns_point(-175.0, -85.0));
        assert!(!cell.owns_point(-170.0, -85.0));
        assert!(!cell.owns_point(-175.0, -80.0));
    }
}
