use std::{collections::BTreeSet, path::Path};

use polars::{frame::DataFrame, prelude::{Column, DataType}};
use tracing::debug;

use crate::{error::{GridError, GridResult}, io, place::PlaceLayer};

/// "The geometry of `place_id` intersects the rectangle of `grid_id`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPlaceRelation {
    pub grid_id: u32,
    pub place_id: u32,
}

/// All grid/place relations for one place layer, sorted by (`grid_id`, `place_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTable {
    layer: PlaceLayer,
    relations: Vec<GridPlaceRelation>,
}

impl RelationTable {
    /// Build a table from relations in any order; duplicates collapse.
    pub fn new(layer: PlaceLayer, mut relations: Vec<GridPlaceRelation>) -> Self {
        relations.sort_unstable();
        relations.dedup();
        Self { layer, relations }
    }

    /// The place layer the `place_id`s refer to.
    #[inline] pub fn layer(&self) -> PlaceLayer { self.layer }

    /// Get the number of relations.
    #[inline] pub fn len(&self) -> usize { self.relations.len() }

    /// Check if there are no relations.
    #[inline] pub fn is_empty(&self) -> bool { self.relations.is_empty() }

    /// Relations in (`grid_id`, `place_id`) order.
    #[inline] pub fn relations(&self) -> &[GridPlaceRelation] { &self.relations }

    #[inline]
    pub fn contains(&self, grid_id: u32, place_id: u32) -> bool {
        self.relations.binary_search(&GridPlaceRelation { grid_id, place_id }).is_ok()
    }

    /// Cells related to `place_id`; empty when the place touches no cell.
    pub fn cells_for_place(&self, place_id: u32) -> BTreeSet<u32> {
        self.relations.iter()
            .filter(|relation| relation.place_id == place_id)
            .map(|relation| relation.grid_id)
            .collect()
    }

    /// Places related to `grid_id`, ascending.
    pub fn places_for_cell(&self, grid_id: u32) -> Vec<u32> {
        let start = self.relations.partition_point(|relation| relation.grid_id < grid_id);
        self.relations[start..].iter()
            .take_while(|relation| relation.grid_id == grid_id)
            .map(|relation| relation.place_id)
            .collect()
    }

    /// Two-column frame: `grid_id` and the layer's id column.
    pub fn to_dataframe(&self) -> GridResult<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new("grid_id".into(), self.relations.iter().map(|r| r.grid_id).collect::<Vec<_>>()),
            Column::new(self.layer.id_column().into(), self.relations.iter().map(|r| r.place_id).collect::<Vec<_>>()),
        ])?)
    }

    /// Parse a frame written by [`RelationTable::to_dataframe`].
    pub(crate) fn from_dataframe(layer: PlaceLayer, df: &DataFrame, origin: &Path) -> GridResult<Self> {
        /// Read an id column as u32, rejecting nulls and out-of-range values.
        fn ids(df: &DataFrame, name: &str, origin: &Path) -> GridResult<Vec<u32>> {
            let column = df.column(name)
                .map_err(|_| GridError::corrupt(origin, format!("missing column {name}")))?;
            let column = column.cast(&DataType::Int64)
                .map_err(|_| GridError::corrupt(origin, format!("column {name} is not integral")))?;
            column.i64()?.into_iter()
                .enumerate()
                .map(|(row, value)| value
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| GridError::corrupt(origin, format!("invalid {name} at row {row}"))))
                .collect()
        }

        let grid_ids = ids(df, "grid_id", origin)?;
        let place_ids = ids(df, layer.id_column(), origin)?;

        Ok(Self::new(layer, grid_ids.into_iter()
            .zip(place_ids)
            .map(|(grid_id, place_id)| GridPlaceRelation { grid_id, place_id })
            .collect()))
    }

    /// Write the table as CSV (`grid_id,<layer>_id`), replacing `path` atomically.
    pub fn persist(&self, path: &Path) -> GridResult<()> {
        io::csv::write_csv(&self.to_dataframe()?, path)?;
        debug!(layer = %self.layer, path = %path.display(), rows = self.len(), "persisted relation table");
        Ok(())
    }

    /// Read a table written by [`RelationTable::persist`].
    pub fn load(layer: PlaceLayer, path: &Path) -> GridResult<Self> {
        let df = io::csv::read_csv(path)?;
        let table = Self::from_dataframe(layer, &df, path)?;
        debug!(layer = %layer, path = %path.display(), rows = table.len(), "loaded relation table");
        Ok(table)
    }

    /// Describe the first `grid_id` outside a grid of `num_cells`, if any.
    ///
    /// Callers attach the origin: a file path for stored tables, the layer
    /// for tables built in memory.
    pub(crate) fn check_grid_ids(&self, num_cells: usize) -> Result<(), String> {
        match self.relations.last() {
            Some(last) if last.grid_id as usize >= num_cells => {
                Err(format!("grid_id {} out of range for a grid of {num_cells} cells", last.grid_id))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RelationTable {
        RelationTable::new(PlaceLayer::Country, vec![
            GridPlaceRelation { grid_id: 37, place_id: 1 },
            GridPlaceRelation { grid_id: 0, place_id: 0 },
            GridPlaceRelation { grid_id: 1, place_id: 0 },
            GridPlaceRelation { grid_id: 1, place_id: 1 },
            GridPlaceRelation { grid_id: 0, place_id: 0 },
        ])
    }

    #[test]
    fn sorted_and_deduplicated() {
        let table = table();
        assert_eq!(table.len(), 4);
        assert!(table.relations().windows(2).all(|w| w[0] < w[1]));
        assert!(table.contains(1, 1));
        assert!(!table.contains(2, 1));
    }

    #[test]
    fn lookups_in_both_directions() {
        let table = table();
        assert_eq!(table.cells_for_place(0).into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(table.cells_for_place(1).into_iter().collect::<Vec<_>>(), vec![1, 37]);
        assert!(table.cells_for_place(9).is_empty());
        assert_eq!(table.places_for_cell(1), vec![0, 1]);
        assert!(table.places_for_cell(2).is_empty());
    }

    #[test]
    fn csv_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PlaceLayer::Country.relation_file_name());

        let table = table();
        table.persist(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("grid_id,country_id"));

        assert_eq!(RelationTable::load(PlaceLayer::Country, &path).unwrap(), table);
    }

    #[test]
    fn empty_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PlaceLayer::City.relation_file_name());

        let table = RelationTable::new(PlaceLayer::City, vec![]);
        table.persist(&path).unwrap();
        assert_eq!(RelationTable::load(PlaceLayer::City, &path).unwrap(), table);
    }

    #[test]
    fn wrong_layer_column_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_country_sjoin.csv");
        table().persist(&path).unwrap();

        let err = RelationTable::load(PlaceLayer::City, &path).unwrap_err();
        assert!(matches!(err, GridError::PersistenceCorrupt { .. }));
    }

    #[test]
    fn negative_ids_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_city_sjoin.csv");
        std::fs::write(&path, "grid_id,city_id\n0,1\n-3,2\n").unwrap();

        let err = RelationTable::load(PlaceLayer::City, &path).unwrap_err();
        assert!(matches!(err, GridError::PersistenceCorrupt { .. }));
    }

    #[test]
    fn grid_id_range_check() {
        let table = table();
        assert!(table.check_grid_ids(648).is_ok());
        assert_eq!(table.check_grid_ids(37).unwrap_err(), "grid_id 37 out of range for a grid of 37 cells");
    }
}
