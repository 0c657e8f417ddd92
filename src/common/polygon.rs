use geo::{Coord, LineString, MultiPolygon, Polygon};

/// Ensure first and last are the same for geo::LineString coords
fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first)
        }
    }
}

/// Get the signed area of a geo::Coord list (negative for clockwise)
fn signed_area(pts: &[Coord<f64>]) -> f64 {
    let mut a = 0.0;
    for w in pts.windows(2) {
        a += w[0].x * w[1].y - w[1].x * w[0].y;
    }
    a / 2.0
}

/// Assemble shapefile-ordered rings into a geo::MultiPolygon<f64>.
///
/// Shapefiles store each clockwise exterior ring followed by its counter-clockwise holes.
/// A hole that appears before any exterior is promoted to an exterior.
pub(crate) fn rings_to_multipolygon(rings: Vec<Vec<Coord<f64>>>) -> MultiPolygon<f64> {
    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for mut coords in rings {
        ensure_closed(&mut coords);
        if coords.len() < 4 {
            continue; // degenerate ring
        }
        let is_exterior = signed_area(&coords) < 0.0 || current_exterior.is_none();
        let ls = LineString(coords);
        if is_exterior {
            // flush previous polygon
            if let Some(ext) = current_exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}
