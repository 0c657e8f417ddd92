use std::fmt;

use geo::{BoundingRect, MultiPolygon, Point, Polygon, Rect, Relate, Intersects};
use serde::{Deserialize, Serialize};

/// The two independent place layers, each with its own identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceLayer {
    Country,
    City,
}

impl PlaceLayer {
    pub const ALL: [PlaceLayer; 2] = [PlaceLayer::Country, PlaceLayer::City];

    /// Lowercase layer name.
    pub fn to_str(self) -> &'static str {
        match self {
            PlaceLayer::Country => "country",
            PlaceLayer::City => "city",
        }
    }

    /// Column holding the place identifier in relation tables.
    pub fn id_column(self) -> &'static str {
        match self {
            PlaceLayer::Country => "country_id",
            PlaceLayer::City => "city_id",
        }
    }

    /// File name of the persisted grid/place relation table.
    pub fn relation_file_name(self) -> &'static str {
        match self {
            PlaceLayer::Country => "grid_country_sjoin.csv",
            PlaceLayer::City => "grid_city_sjoin.csv",
        }
    }

    /// Source attribute holding the place name.
    pub fn name_attribute(self) -> &'static str {
        match self {
            PlaceLayer::Country => "COUNTRY",
            PlaceLayer::City => "CITY_NAME",
        }
    }

    /// Source attribute holding the containing country, if the layer has one.
    pub fn country_attribute(self) -> Option<&'static str> {
        match self {
            PlaceLayer::Country => None,
            PlaceLayer::City => Some("CNTRY_NAME"),
        }
    }
}

impl fmt::Display for PlaceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Point or areal geometry of a place, in lon/lat degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceGeometry {
    Point(Point<f64>),
    Area(MultiPolygon<f64>),
}

impl PlaceGeometry {
    /// Bounding rectangle, or `None` for an empty area.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            PlaceGeometry::Point(point) => Some(point.bounding_rect()),
            PlaceGeometry::Area(mp) => mp.bounding_rect(),
        }
    }

    /// True if the geometry shares at least one point with `polygon` (boundaries included).
    pub fn intersects(&self, polygon: &Polygon<f64>) -> bool {
        match self {
            PlaceGeometry::Point(point) => point.intersects(polygon),
            PlaceGeometry::Area(mp) => mp.intersects(polygon),
        }
    }

    /// True if the geometry intersects `polygon` other than only along their boundaries.
    pub fn overlaps_interior(&self, polygon: &Polygon<f64>) -> bool {
        if !self.intersects(polygon) {
            return false;
        }
        let matrix = match self {
            PlaceGeometry::Point(point) => point.relate(polygon),
            PlaceGeometry::Area(mp) => mp.relate(polygon),
        };
        matrix.is_intersects() && !matrix.is_touches()
    }

    /// True if the geometry contains or touches the point (`lon`, `lat`).
    pub fn covers_point(&self, lon: f64, lat: f64) -> bool {
        let target = Point::new(lon, lat);
        match self {
            PlaceGeometry::Point(point) => *point == target,
            PlaceGeometry::Area(mp) => mp.intersects(&target),
        }
    }
}

/// A named country or city with a stable per-layer identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceFeature {
    pub place_id: u32,    // Position in the source feature collection
    pub name: String,
    pub country: Option<String>, // Containing country (cities only)
    pub geometry: PlaceGeometry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Rect, Coord};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x0 + size, y: y0 + size }).to_polygon()
    }

    #[test]
    fn touching_squares_intersect_but_do_not_overlap() {
        let place = PlaceGeometry::Area(MultiPolygon(vec![square(0.0, 0.0, 10.0)]));
        let neighbour = square(10.0, 0.0, 10.0);

        assert!(place.intersects(&neighbour));
        assert!(!place.overlaps_interior(&neighbour));
        assert!(place.overlaps_interior(&square(5.0, 5.0, 10.0)));
        assert!(place.overlaps_interior(&square(0.0, 0.0, 10.0)));
    }

    #[test]
    fn point_on_boundary_intersects_only() {
        let place = PlaceGeometry::Point(Point::new(10.0, 5.0));
        let cell = square(0.0, 0.0, 10.0);
        assert!(place.intersects(&cell));
        assert!(!place.overlaps_interior(&cell));

        let inside = PlaceGeometry::Point(Point::new(5.0, 5.0));
        assert!(inside.overlaps_interior(&cell));
    }

    #[test]
    fn disjoint_geometries() {
        let place = PlaceGeometry::Area(MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)]),
            vec![],
        )]));
        let cell = square(0.0, 0.0, 10.0);
        assert!(!place.intersects(&cell));
        assert!(!place.overlaps_interior(&cell));
        assert!(place.bounding_rect().is_some());
    }

    #[test]
    fn layer_names_and_columns() {
        assert_eq!(PlaceLayer::Country.id_column(), "country_id");
        assert_eq!(PlaceLayer::City.relation_file_name(), "grid_city_sjoin.csv");
        assert_eq!(PlaceLayer::City.country_attribute(), Some("CNTRY_NAME"));
        assert_eq!(PlaceLayer::Country.to_string(), "country");
    }
}
