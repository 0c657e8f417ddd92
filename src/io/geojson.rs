//! GeoJSON reading and writing for grid cells and place features.

use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use serde_json::{json, Map, Value};

use crate::{error::{GridError, GridResult}, grid::Grid, place::PlaceGeometry};

/// Write the grid cells to GeoJSON bytes, one `Polygon` feature per cell in enumeration order.
pub(crate) fn write_grid_geojson(grid: &Grid) -> GridResult<Vec<u8>> {
    let features: Vec<Value> = grid.cells().iter().map(|cell| {
        let ring: Vec<[f64; 2]> = cell.polygon().exterior().coords()
            .map(|c| [c.x, c.y])
            .collect();

        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring]
            },
            "properties": {
                "grid_id": cell.id()
            }
        })
    }).collect();

    let feature_collection = json!({
        "type": "FeatureCollection",
        "spacing": grid.spacing(),
        "features": features,
    });

    Ok(serde_json::to_vec(&feature_collection)?)
}

/// Read a grid from GeoJSON bytes written by [`write_grid_geojson`].
pub(crate) fn read_grid_geojson(bytes: &[u8], origin: &Path) -> GridResult<Grid> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| GridError::corrupt(origin, format!("unparseable GeoJSON: {e}")))?;

    let features = value["features"].as_array()
        .ok_or_else(|| GridError::corrupt(origin, "missing features array"))?;

    let rects = features.iter().enumerate()
        .map(|(i, feature)| {
            if let Some(id) = feature["properties"]["grid_id"].as_u64() {
                if id != i as u64 {
                    return Err(GridError::corrupt(origin, format!("feature {i} carries grid_id {id}")));
                }
            }
            let polygon = match parse_geometry(&feature["geometry"]) {
                Some(Geometry::Polygon(polygon)) => polygon,
                _ => return Err(GridError::corrupt(origin, format!("feature {i} is not a polygon"))),
            };
            polygon_bounds(&polygon)
                .ok_or_else(|| GridError::corrupt(origin, format!("feature {i} has an empty ring")))
        })
        .collect::<GridResult<Vec<_>>>()?;

    // Older files lack the spacing member; every cell is square, so the first one tells.
    let spacing = match value["spacing"].as_f64() {
        Some(spacing) => spacing,
        None => rects.first()
            .map(|rect| rect.width())
            .ok_or_else(|| GridError::corrupt(origin, "grid has no cells"))?,
    };

    Grid::from_rects(spacing, &rects, origin)
}

/// Read place features from a GeoJSON FeatureCollection.
/// Returns each feature's properties object alongside its geometry, in file order.
pub(crate) fn read_place_geojson(bytes: &[u8], origin: &Path) -> GridResult<Vec<(Map<String, Value>, PlaceGeometry)>> {
    let origin_str = origin.display().to_string();
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| GridError::schema(origin_str.clone(), format!("unparseable GeoJSON: {e}")))?;

    let features = value["features"].as_array()
        .ok_or_else(|| GridError::schema(origin_str.clone(), "not a FeatureCollection"))?;

    features.iter().enumerate()
        .map(|(i, feature)| {
            let properties = feature["properties"].as_object().cloned().unwrap_or_default();
            let geometry = match parse_geometry(&feature["geometry"]) {
                Some(Geometry::Point(point)) => PlaceGeometry::Point(point),
                Some(Geometry::Polygon(polygon)) => PlaceGeometry::Area(MultiPolygon(vec![polygon])),
                Some(Geometry::MultiPolygon(mp)) => PlaceGeometry::Area(mp),
                None => return Err(GridError::schema(
                    origin_str.clone(),
                    format!("feature {i} has no Point, Polygon or MultiPolygon geometry"),
                )),
            };
            Ok((properties, geometry))
        })
        .collect()
}

/// Write place geometries with their properties to GeoJSON bytes.
pub(crate) fn write_place_geojson<'a>(
    features: impl Iterator<Item = (Map<String, Value>, &'a PlaceGeometry)>,
) -> GridResult<Vec<u8>> {
    let features: Vec<Value> = features.map(|(properties, geometry)| {
        let geometry = match geometry {
            PlaceGeometry::Point(point) => json!({
                "type": "Point",
                "coordinates": [point.x(), point.y()],
            }),
            PlaceGeometry::Area(mp) => json!({
                "type": "MultiPolygon",
                "coordinates": mp.0.iter().map(polygon_coords).collect::<Vec<_>>(),
            }),
        };
        json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        })
    }).collect();

    Ok(serde_json::to_vec(&json!({
        "type": "FeatureCollection",
        "features": features,
    }))?)
}

/// The geometry kinds this crate reads.
enum Geometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

/// Parse a GeoJSON geometry object, or `None` for unsupported or malformed input.
fn parse_geometry(geometry: &Value) -> Option<Geometry> {
    let coords = geometry["coordinates"].as_array()?;
    match geometry["type"].as_str()? {
        "Point" => parse_coord(&geometry["coordinates"]).map(|c| Geometry::Point(c.into())),
        "Polygon" => parse_polygon_coords(coords).map(Geometry::Polygon),
        "MultiPolygon" => coords.iter()
            .map(|polygon| parse_polygon_coords(polygon.as_array()?))
            .collect::<Option<Vec<_>>>()
            .map(|polygons| Geometry::MultiPolygon(MultiPolygon(polygons))),
        _ => None,
    }
}

/// Parse standard GeoJSON polygon coordinates: `[exterior, hole, hole, ...]`.
fn parse_polygon_coords(rings: &[Value]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| parse_ring_coords(ring.as_array()?));
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Parse a ring from `[[x, y], [x, y], ...]`, closing it if needed.
fn parse_ring_coords(coords: &[Value]) -> Option<LineString<f64>> {
    let mut points = coords.iter().map(parse_coord).collect::<Option<Vec<_>>>()?;
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last {
            points.push(first);
        }
    }
    Some(LineString(points))
}

/// Parse a single `[x, y]` position (extra ordinates are ignored).
fn parse_coord(value: &Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    Some(Coord { x: pair.first()?.as_f64()?, y: pair.get(1)?.as_f64()? })
}

fn polygon_coords(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

/// Bounds of a polygon's exterior ring.
fn polygon_bounds(polygon: &Polygon<f64>) -> Option<Rect<f64>> {
    let mut coords = polygon.exterior().coords();
    let first = *coords.next()?;
    let (min, max) = coords.fold((first, first), |(min, max), c| (
        Coord { x: min.x.min(c.x), y: min.y.min(c.y) },
        Coord { x: max.x.max(c.x), y: max.y.max(c.y) },
    ));
    Some(Rect::new(min, max))
}
