use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    error::{GridError, GridResult},
    grid::Grid,
    join::RelationTable,
    place::{PlaceCatalog, PlaceFeature, PlaceLayer},
};

/// Cells related to `place_id`; empty when the place touches no cell.
pub fn cells_for_place_id(place_id: u32, relations: &RelationTable) -> BTreeSet<u32> {
    relations.cells_for_place(place_id)
}

/// Cells related to the place named `name` (within `country`, for cities).
pub fn cells_for_place_name(
    name: &str,
    country: Option<&str>,
    catalog: &PlaceCatalog,
    relations: &RelationTable,
) -> GridResult<BTreeSet<u32>> {
    if catalog.layer() != relations.layer() {
        return Err(layer_mismatch(catalog.layer(), relations.layer()));
    }
    let place_id = match catalog.layer() {
        PlaceLayer::Country => catalog.find_country_id(name)?,
        PlaceLayer::City => catalog.find_city_id(name, country)?,
    };
    let cells = cells_for_place_id(place_id, relations);
    debug!(layer = %catalog.layer(), name, place_id, cells = cells.len(), "resolved place to cells");
    Ok(cells)
}

/// Cell containing (`lon`, `lat`); see [`Grid::cell_for_point`].
pub fn cell_for_point(lon: f64, lat: f64, grid: &Grid) -> GridResult<u32> {
    grid.cell_for_point(lon, lat)
}

fn layer_mismatch(catalog: PlaceLayer, relations: PlaceLayer) -> GridError {
    GridError::schema(
        format!("{relations} relation table"),
        format!("relations do not belong to the {catalog} catalog"),
    )
}

/// A place catalog together with its relation table.
#[derive(Debug, Clone)]
pub struct PlaceIndex {
    catalog: PlaceCatalog,
    relations: RelationTable,
}

impl PlaceIndex {
    pub fn new(catalog: PlaceCatalog, relations: RelationTable) -> GridResult<Self> {
        if catalog.layer() != relations.layer() {
            return Err(layer_mismatch(catalog.layer(), relations.layer()));
        }
        Ok(Self { catalog, relations })
    }

    #[inline] pub fn layer(&self) -> PlaceLayer { self.catalog.layer() }

    #[inline] pub fn catalog(&self) -> &PlaceCatalog { &self.catalog }

    #[inline] pub fn relations(&self) -> &RelationTable { &self.relations }

    pub fn cells_for_name(&self, name: &str, country: Option<&str>) -> GridResult<BTreeSet<u32>> {
        cells_for_place_name(name, country, &self.catalog, &self.relations)
    }
}

/// Query surface over one grid and its country and city indexes.
#[derive(Debug, Clone)]
pub struct GridLookup {
    grid: Grid,
    countries: Option<PlaceIndex>,
    cities: Option<PlaceIndex>,
}

impl GridLookup {
    pub fn new(grid: Grid) -> Self {
        Self { grid, countries: None, cities: None }
    }

    /// Attach a place index, replacing any index of the same layer.
    pub fn with_index(mut self, index: PlaceIndex) -> GridResult<Self> {
        index.relations().check_grid_ids(self.grid.len()).map_err(|detail| {
            GridError::schema(format!("{} relation table", index.layer()), detail)
        })?;
        match index.layer() {
            PlaceLayer::Country => self.countries = Some(index),
            PlaceLayer::City => self.cities = Some(index),
        }
        Ok(self)
    }

    #[inline] pub fn grid(&self) -> &Grid { &self.grid }

    /// The index for `layer`, or `NotFound` if none is attached.
    pub fn index(&self, layer: PlaceLayer) -> GridResult<&PlaceIndex> {
        match layer {
            PlaceLayer::Country => self.countries.as_ref(),
            PlaceLayer::City => self.cities.as_ref(),
        }
        .ok_or_else(|| GridError::NotFound(format!("{layer} index")))
    }

    pub fn cells_for_country(&self, name: &str) -> GridResult<BTreeSet<u32>> {
        self.index(PlaceLayer::Country)?.cells_for_name(name, None)
    }

    pub fn cells_for_city(&self, name: &str, country: Option<&str>) -> GridResult<BTreeSet<u32>> {
        self.index(PlaceLayer::City)?.cells_for_name(name, country)
    }

    pub fn cell_for_point(&self, lon: f64, lat: f64) -> GridResult<u32> {
        cell_for_point(lon, lat, &self.grid)
    }

    /// Places of `layer` whose geometry covers (`lon`, `lat`), in identifier order.
    ///
    /// Candidates come from every cell touching the point, so a place related
    /// only to a neighbouring cell is still found on a shared edge. An empty
    /// result means the point is in the grid but in no place.
    pub fn places_at_point(&self, layer: PlaceLayer, lon: f64, lat: f64) -> GridResult<Vec<&PlaceFeature>> {
        let index = self.index(layer)?;
        let touching = self.grid.cells_touching_point(lon, lat);
        if touching.is_empty() {
            return Err(GridError::PointOutsideGrid { lon, lat });
        }
        let candidates = touching.into_iter()
            .flat_map(|grid_id| index.relations().places_for_cell(grid_id))
            .collect::<BTreeSet<_>>();
        Ok(candidates.into_iter()
            .filter_map(|place_id| index.catalog().get(place_id))
            .filter(|feature| feature.geometry.covers_point(lon, lat))
            .collect())
    }
}
