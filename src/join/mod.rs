mod relation;
mod spatial;

pub use relation::{GridPlaceRelation, RelationTable};
pub use spatial::{JoinPredicate, SpatialJoin};
