mod catalog;
mod feature;

pub use catalog::{NamePolicy, PlaceCatalog};
pub use feature::{PlaceFeature, PlaceGeometry, PlaceLayer};
