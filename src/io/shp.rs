//! Shapefile reading for place layers.

use std::path::Path;

use geo::{Coord, Point};
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};

use crate::{common, error::{GridError, GridResult}, place::PlaceGeometry};

/// Reads all shapes + attribute records from a given `.shp` file path.
pub(crate) fn read_shapefile(path: &Path) -> GridResult<Vec<(Shape, Record)>> {
    let origin = path.display().to_string();
    let mut reader = Reader::from_path(path)
        .map_err(|e| GridError::schema(origin.clone(), format!("failed to open shapefile: {e}")))?;

    reader.iter_shapes_and_records()
        .map(|result| result.map_err(|e| GridError::schema(origin.clone(), format!("error reading shape+record: {e}"))))
        .collect()
}

/// Get the trimmed value of a character field from a Record, if present.
pub(crate) fn character_field(record: &Record, field: &str) -> Option<Option<String>> {
    match record.get(field)? {
        FieldValue::Character(value) => Some(value.as_ref().map(|s| s.trim().to_string())),
        FieldValue::Memo(value) => Some(Some(value.trim().to_string())),
        _ => None,
    }
}

/// Convert a shapefile shape into a place geometry.
pub(crate) fn shape_to_geometry(shape: Shape, origin: &Path) -> GridResult<PlaceGeometry> {
    /// Flatten the rings of any polygon flavour to 2D coordinate lists.
    macro_rules! rings {
        ($polygon:expr) => {
            $polygon.rings().iter()
                .map(|ring| ring.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
    }

    Ok(match shape {
        Shape::Point(pt) => PlaceGeometry::Point(Point::new(pt.x, pt.y)),
        Shape::PointM(pt) => PlaceGeometry::Point(Point::new(pt.x, pt.y)),
        Shape::PointZ(pt) => PlaceGeometry::Point(Point::new(pt.x, pt.y)),
        Shape::Polygon(polygon) => PlaceGeometry::Area(common::rings_to_multipolygon(rings!(polygon))),
        Shape::PolygonM(polygon) => PlaceGeometry::Area(common::rings_to_multipolygon(rings!(polygon))),
        Shape::PolygonZ(polygon) => PlaceGeometry::Area(common::rings_to_multipolygon(rings!(polygon))),
        other => return Err(GridError::schema(
            origin.display().to_string(),
            format!("unsupported shape type {:?}", other.shapetype()),
        )),
    })
}
