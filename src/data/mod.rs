mod dataset;
mod joiner;
mod provider;
mod transform;
mod variable;

pub use dataset::{GriddedDataset, TimeAxis};
pub use joiner::{aggregate_over_cells, join_to_grid, write_series_csv, JoinOptions, JoinedGrid};
pub use provider::{DatasetProvider, LocalDirProvider};
pub use transform::wrap_longitude;
pub use variable::{variable, VariableSpec, DIMENSIONS, VARIABLES};
