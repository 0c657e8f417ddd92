use rayon::prelude::*;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{grid::{bbox::{envelope_of, BoundingBox}, Grid, GridCell}, place::{PlaceCatalog, PlaceFeature}};
use super::relation::{GridPlaceRelation, RelationTable};

/// Geometric test deciding whether a cell and a place are related.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPredicate {
    /// The geometries share at least one point, boundaries included.
    #[default]
    Intersects,
    /// The geometries intersect other than only along their boundaries.
    InteriorOverlap,
}

impl JoinPredicate {
    #[inline]
    fn test(self, feature: &PlaceFeature, cell: &GridCell) -> bool {
        let polygon = cell.polygon();
        match self {
            JoinPredicate::Intersects => feature.geometry.intersects(&polygon),
            JoinPredicate::InteriorOverlap => feature.geometry.overlaps_interior(&polygon),
        }
    }
}

/// Spatial join between grid cells and the features of one place layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialJoin {
    predicate: JoinPredicate,
}

impl SpatialJoin {
    pub fn new(predicate: JoinPredicate) -> Self {
        Self { predicate }
    }

    #[inline] pub fn predicate(&self) -> JoinPredicate { self.predicate }

    /// Every (cell, place) pair satisfying the predicate.
    ///
    /// Candidates come from an R-tree over place bounding boxes and every
    /// candidate is confirmed with the exact geometric test, so the result
    /// equals the exhaustive pairwise join. Cells with no match contribute no rows.
    pub fn intersect(&self, grid: &Grid, catalog: &PlaceCatalog) -> RelationTable {
        let rtree = RTree::bulk_load(
            catalog.features().iter().enumerate()
                .filter_map(|(i, feature)| Some(BoundingBox::new(i, feature.geometry.bounding_rect()?)))
                .collect()
        );

        let relations = grid.cells().par_iter()
            .flat_map_iter(|cell| {
                let features = catalog.features();
                rtree.locate_in_envelope_intersecting(&envelope_of(&cell.rect()))
                    .map(move |bbox| &features[bbox.idx()])
                    .filter(move |feature| self.predicate.test(feature, cell))
                    .map(move |feature| GridPlaceRelation { grid_id: cell.id(), place_id: feature.place_id })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let table = RelationTable::new(catalog.layer(), relations);
        info!(
            layer = %catalog.layer(),
            predicate = ?self.predicate,
            cells = grid.len(),
            places = catalog.len(),
            relations = table.len(),
            "computed spatial join"
        );
        table
    }

    /// Reference O(cells x places) join used to check [`SpatialJoin::intersect`].
    #[cfg(test)]
    pub(crate) fn intersect_exhaustive(&self, grid: &Grid, catalog: &PlaceCatalog) -> RelationTable {
        let relations = grid.cells().iter()
            .flat_map(|cell| catalog.features().iter()
                .filter(move |feature| self.predicate.test(feature, cell))
                .map(move |feature| GridPlaceRelation { grid_id: cell.id(), place_id: feature.place_id }))
            .collect();
        RelationTable::new(catalog.layer(), relations)
    }
}
