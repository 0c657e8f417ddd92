pub(crate) mod bbox;
mod cell;
mod grid;

pub use cell::GridCell;
pub use grid::Grid;
