#![doc = "globegrid public API"]
mod common;
mod config;
mod data;
mod error;
mod grid;
mod io;
mod join;
mod lookup;
mod place;
mod store;

#[doc(inline)]
pub use error::{GridError, GridResult};

#[doc(inline)]
pub use config::GridConfig;

#[doc(inline)]
pub use grid::{Grid, GridCell};

#[doc(inline)]
pub use place::{NamePolicy, PlaceCatalog, PlaceFeature, PlaceGeometry, PlaceLayer};

#[doc(inline)]
pub use join::{GridPlaceRelation, JoinPredicate, RelationTable, SpatialJoin};

#[doc(inline)]
pub use lookup::{cell_for_point, cells_for_place_id, cells_for_place_name, GridLookup, PlaceIndex};

#[doc(inline)]
pub use store::GridStore;

#[doc(inline)]
pub use data::{
    aggregate_over_cells, join_to_grid, variable, wrap_longitude, DatasetProvider, GriddedDataset,
    JoinOptions, JoinedGrid, LocalDirProvider, TimeAxis, VariableSpec, DIMENSIONS, VARIABLES,
    write_series_csv,
};
