use std::path::Path;

use geo::{Polygon, Rect};
use rstar::{RTree, AABB};
use tracing::{debug, info};

use crate::{common, error::{GridError, GridResult}, io};
use super::{bbox::{envelope_of, BoundingBox}, cell::GridCell};

/// Relative tolerance when checking that the spacing divides 180 and 360.
const DIVISION_TOLERANCE: f64 = 1e-9;

/// A uniform tiling of [-180, 180) x [-90, 90) into square cells.
#[derive(Debug, Clone)]
pub struct Grid {
    spacing: f64,
    num_lat: usize,
    num_lon: usize,
    cells: Vec<GridCell>,
    rtree: RTree<BoundingBox>,
}

impl Grid {
    /// Build the tiling for `spacing` degrees, in row-major (latitude-major) order.
    ///
    /// Spacings that do not divide 180 and 360 evenly are rejected rather than
    /// producing a partial last row or column.
    pub fn build(spacing: f64) -> GridResult<Self> {
        let (num_lat, num_lon) = Self::steps(spacing)?;

        let cells = (0..num_lat)
            .flat_map(|i| (0..num_lon).map(move |j| GridCell::new(i, j, num_lon, spacing)))
            .collect::<Vec<_>>();

        info!(spacing, num_lat, num_lon, cells = cells.len(), "built grid");
        Ok(Self::from_cells(spacing, num_lat, num_lon, cells))
    }

    /// Number of (latitude, longitude) steps for a spacing, or `InvalidSpacing`.
    pub fn steps(spacing: f64) -> GridResult<(usize, usize)> {
        /// Number of whole steps of `spacing` in `extent`, if it divides evenly.
        fn divides(extent: f64, spacing: f64) -> Option<usize> {
            let n = (extent / spacing).round();
            (n >= 1.0 && (n * spacing - extent).abs() <= extent * DIVISION_TOLERANCE).then_some(n as usize)
        }

        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(GridError::InvalidSpacing(spacing));
        }
        match (divides(180.0, spacing), divides(360.0, spacing)) {
            (Some(num_lat), Some(num_lon)) if num_lat.checked_mul(num_lon).is_some_and(|n| n <= u32::MAX as usize) =>
                Ok((num_lat, num_lon)),
            _ => Err(GridError::InvalidSpacing(spacing)),
        }
    }

    fn from_cells(spacing: f64, num_lat: usize, num_lon: usize, cells: Vec<GridCell>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                cells.iter().enumerate()
                    .map(|(i, cell)| BoundingBox::new(i, cell.rect()))
                    .collect()
            ),
            spacing,
            num_lat,
            num_lon,
            cells,
        }
    }

    /// Cell side length, in degrees.
    #[inline] pub fn spacing(&self) -> f64 { self.spacing }

    /// Number of latitude rows.
    #[inline] pub fn num_lat(&self) -> usize { self.num_lat }

    /// Number of longitude columns.
    #[inline] pub fn num_lon(&self) -> usize { self.num_lon }

    /// Get the number of cells.
    #[inline] pub fn len(&self) -> usize { self.cells.len() }

    /// Check if there are no cells.
    #[inline] pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Cells in enumeration order; position equals `grid_id`.
    #[inline] pub fn cells(&self) -> &[GridCell] { &self.cells }

    /// Get a cell by its identifier.
    #[inline] pub fn cell(&self, grid_id: u32) -> Option<&GridCell> { self.cells.get(grid_id as usize) }

    /// Cell polygons in enumeration order.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        self.cells.iter().map(GridCell::polygon).collect()
    }

    /// Directory/file stem keyed by spacing, e.g. `grid_2.5`.
    pub fn dir_name(spacing: f64) -> String { format!("grid_{spacing}") }

    /// Identifiers of cells whose rectangle shares at least one point with `rect`, ascending.
    pub fn cells_intersecting(&self, rect: &Rect<f64>) -> Vec<u32> {
        let mut ids = self.rtree.locate_in_envelope_intersecting(&envelope_of(rect))
            .map(|bbox| self.cells[bbox.idx()].id())
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// Identifiers of every cell whose closed rectangle contains (`lon`, `lat`), ascending.
    ///
    /// A point on a shared edge touches two cells and a shared corner four.
    pub fn cells_touching_point(&self, lon: f64, lat: f64) -> Vec<u32> {
        if !lon.is_finite() || !lat.is_finite() {
            return Vec::new();
        }
        let mut ids = self.rtree.locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .map(|bbox| &self.cells[bbox.idx()])
            .filter(|cell| cell.touches_point(lon, lat))
            .map(GridCell::id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// The cell containing (`lon`, `lat`).
    ///
    /// Each cell owns its western and southern edges, so a point on a shared
    /// edge or corner resolves to the cell east and north of it. Points on the
    /// eastern (180) or northern (90) edge of the globe, which no cell owns,
    /// resolve to the first touching cell in enumeration order.
    pub fn cell_for_point(&self, lon: f64, lat: f64) -> GridResult<u32> {
        let touching = self.cells_touching_point(lon, lat);
        touching.iter().copied()
            .find(|&id| self.cells[id as usize].owns_point(lon, lat))
            .or_else(|| touching.first().copied())
            .ok_or(GridError::PointOutsideGrid { lon, lat })
    }

    /// Rebuild a grid from persisted rectangles, checking that they are exactly
    /// the cells of `spacing` in enumeration order.
    pub(crate) fn from_rects(spacing: f64, rects: &[Rect<f64>], origin: &Path) -> GridResult<Self> {
        let (num_lat, num_lon) = Self::steps(spacing)
            .map_err(|_| GridError::corrupt(origin, format!("invalid spacing {spacing}")))?;

        if rects.len() != num_lat * num_lon {
            return Err(GridError::corrupt(origin, format!(
                "expected {} cells for spacing {spacing}, found {}", num_lat * num_lon, rects.len()
            )));
        }

        let tolerance = spacing * 1e-9;
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;

        let cells = (0..num_lat)
            .flat_map(|i| (0..num_lon).map(move |j| GridCell::new(i, j, num_lon, spacing)))
            .collect::<Vec<_>>();

        for (cell, rect) in cells.iter().zip(rects) {
            let expected = cell.rect();
            if !(close(rect.min().x, expected.min().x) && close(rect.min().y, expected.min().y)
                && close(rect.max().x, expected.max().x) && close(rect.max().y, expected.max().y))
            {
                return Err(GridError::corrupt(origin, format!(
                    "cell {} has bounds {:?}, expected {:?}", cell.id(), rect, expected
                )));
            }
        }

        Ok(Self::from_cells(spacing, num_lat, num_lon, cells))
    }

    /// Write the cell polygons to a GeoJSON file at `path`, replacing it atomically.
    pub fn persist(&self, path: &Path) -> GridResult<()> {
        let bytes = io::write_grid_geojson(self)?;
        common::write_atomic(path, &bytes)?;
        debug!(path = %path.display(), cells = self.len(), "persisted grid");
        Ok(())
    }

    /// Read a grid previously written by [`Grid::persist`].
    pub fn load(path: &Path) -> GridResult<Self> {
        common::require_file_exists(path)?;
        let bytes = std::fs::read(path)?;
        let grid = io::read_grid_geojson(&bytes, path)?;
        debug!(path = %path.display(), cells = grid.len(), "loaded grid");
        Ok(grid)
    }
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.spacing == other.spacing && self.cells == other.cells
    }
}
