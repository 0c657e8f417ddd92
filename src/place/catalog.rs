use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{common, error::{GridError, GridResult}, io};
use super::feature::{PlaceFeature, PlaceGeometry, PlaceLayer};

/// How name lookups treat several rows sharing a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePolicy {
    /// Return the first match in source order.
    #[default]
    FirstMatch,
    /// Fail with `AmbiguousName` when more than one row matches.
    Strict,
}

/// The features of one place layer, in source order.
#[derive(Debug, Clone)]
pub struct PlaceCatalog {
    layer: PlaceLayer,
    features: Vec<PlaceFeature>,
    policy: NamePolicy,
}

impl PlaceCatalog {
    /// Build a catalog from (name, country, geometry) rows; identifiers follow row order.
    pub fn from_features(
        layer: PlaceLayer,
        rows: impl IntoIterator<Item = (String, Option<String>, PlaceGeometry)>,
    ) -> Self {
        let features = rows.into_iter().enumerate()
            .map(|(i, (name, country, geometry))| PlaceFeature { place_id: i as u32, name, country, geometry })
            .collect();
        Self { layer, features, policy: NamePolicy::default() }
    }

    /// Load the country layer (`COUNTRY` + geometry).
    pub fn load_countries(path: &Path) -> GridResult<Self> {
        Self::load(PlaceLayer::Country, path)
    }

    /// Load the city layer (`CITY_NAME`, `CNTRY_NAME` + geometry).
    pub fn load_cities(path: &Path) -> GridResult<Self> {
        Self::load(PlaceLayer::City, path)
    }

    /// Load a layer from a shapefile (`.shp`) or GeoJSON (`.geojson`/`.json`) source.
    pub fn load(layer: PlaceLayer, path: &Path) -> GridResult<Self> {
        common::require_file_exists(path)?;

        let extension = path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let catalog = match extension.as_deref() {
            Some("shp") => Self::from_shapefile(layer, path)?,
            Some("geojson") | Some("json") => Self::from_geojson(layer, path)?,
            _ => return Err(GridError::schema(
                path.display().to_string(),
                "unsupported place source; expected .shp, .geojson or .json",
            )),
        };

        info!(layer = %layer, path = %path.display(), features = catalog.len(), "loaded place catalog");
        Ok(catalog)
    }

    fn from_shapefile(layer: PlaceLayer, path: &Path) -> GridResult<Self> {
        let origin = path.display().to_string();
        let rows = io::shp::read_shapefile(path)?.into_iter().enumerate()
            .map(|(i, (shape, record))| {
                let field = |name: &str| io::shp::character_field(&record, name)
                    .ok_or_else(|| GridError::schema(origin.clone(), format!("missing attribute column {name} (row {i})")));

                let name = field(layer.name_attribute())?.unwrap_or_default();
                let country = match layer.country_attribute() {
                    Some(attribute) => Some(field(attribute)?.unwrap_or_default()),
                    None => None,
                };
                Ok((name, country, io::shp::shape_to_geometry(shape, path)?))
            })
            .collect::<GridResult<Vec<_>>>()?;

        Ok(Self::from_features(layer, rows))
    }

    fn from_geojson(layer: PlaceLayer, path: &Path) -> GridResult<Self> {
        let origin = path.display().to_string();
        let bytes = std::fs::read(path)?;
        let rows = io::read_place_geojson(&bytes, path)?.into_iter().enumerate()
            .map(|(i, (properties, geometry))| {
                let field = |name: &str| match properties.get(name) {
                    Some(Value::String(s)) => Ok(s.trim().to_string()),
                    Some(Value::Null) => Ok(String::new()),
                    Some(other) => Ok(other.to_string()),
                    None => Err(GridError::schema(origin.clone(), format!("missing attribute column {name} (row {i})"))),
                };

                let name = field(layer.name_attribute())?;
                let country = layer.country_attribute().map(field).transpose()?;
                Ok((name, country, geometry))
            })
            .collect::<GridResult<Vec<_>>>()?;

        Ok(Self::from_features(layer, rows))
    }

    /// Write the normalized catalog ({name, country, geometry}) as GeoJSON.
    pub fn write_geojson(&self, path: &Path) -> GridResult<()> {
        let bytes = io::write_place_geojson(self.features.iter().map(|feature| {
            let mut properties = Map::new();
            properties.insert(self.layer.name_attribute().into(), Value::String(feature.name.clone()));
            if let (Some(attribute), Some(country)) = (self.layer.country_attribute(), &feature.country) {
                properties.insert(attribute.into(), Value::String(country.clone()));
            }
            (properties, &feature.geometry)
        }))?;
        common::write_atomic(path, &bytes)
    }

    /// Use the given policy for name lookups.
    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The layer this catalog holds.
    #[inline] pub fn layer(&self) -> PlaceLayer { self.layer }

    /// Get the number of features.
    #[inline] pub fn len(&self) -> usize { self.features.len() }

    /// Check if there are no features.
    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Features in source order; position equals `place_id`.
    #[inline] pub fn features(&self) -> &[PlaceFeature] { &self.features }

    /// Get a feature by identifier.
    #[inline] pub fn get(&self, place_id: u32) -> Option<&PlaceFeature> { self.features.get(place_id as usize) }

    /// Identifier of the country named exactly `name`.
    pub fn find_country_id(&self, name: &str) -> GridResult<u32> {
        self.require_layer(PlaceLayer::Country)?;
        self.find_id(name, None)
    }

    /// Identifier of the city named exactly `name`, optionally within `country`.
    pub fn find_city_id(&self, name: &str, country: Option<&str>) -> GridResult<u32> {
        self.require_layer(PlaceLayer::City)?;
        self.find_id(name, country)
    }

    /// Exact, case-sensitive lookup by name (and containing country, when given).
    pub fn find_id(&self, name: &str, country: Option<&str>) -> GridResult<u32> {
        let mut matches = self.features.iter()
            .filter(|feature| feature.name == name)
            .filter(|feature| country.is_none() || feature.country.as_deref() == country)
            .map(|feature| feature.place_id);

        let first = matches.next().ok_or_else(|| GridError::NotFound(match country {
            Some(country) => format!("{} {name:?} in {country:?}", self.layer),
            None => format!("{} {name:?}", self.layer),
        }))?;

        let others = matches.count();
        if others > 0 {
            match self.policy {
                NamePolicy::FirstMatch => debug!(layer = %self.layer, name, matches = others + 1, "ambiguous name, using first match"),
                NamePolicy::Strict => return Err(GridError::AmbiguousName { name: name.to_string(), count: others + 1 }),
            }
        }
        Ok(first)
    }

    fn require_layer(&self, layer: PlaceLayer) -> GridResult<()> {
        if self.layer != layer {
            return Err(GridError::schema(
                format!("{} catalog", self.layer),
                format!("expected a {layer} catalog"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, MultiPolygon, Point, Rect};
    use serde_json::json;

    fn square(x0: f64, y0: f64, size: f64) -> PlaceGeometry {
        PlaceGeometry::Area(MultiPolygon(vec![
            Rect::new(Coord { x: x0, y: y0 }, Coord { x: x0 + size, y: y0 + size }).to_polygon()
        ]))
    }

    fn cities() -> PlaceCatalog {
        PlaceCatalog::from_features(PlaceLayer::City, vec![
            ("Paris".to_string(), Some("France".to_string()), PlaceGeometry::Point(Point::new(2.35, 48.85))),
            ("Paris".to_string(), Some("United States".to_string()), PlaceGeometry::Point(Point::new(-95.55, 33.66))),
            ("Lyon".to_string(), Some("France".to_string()), PlaceGeometry::Point(Point::new(4.83, 45.76))),
        ])
    }

    #[test]
    fn identifiers_follow_source_order() {
        let catalog = cities();
        let ids: Vec<u32> = catalog.features().iter().map(|f| f.place_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(catalog.get(2).unwrap().name, "Lyon");
    }

    #[test]
    fn city_lookup_uses_country() {
        let catalog = cities();
        assert_eq!(catalog.find_city_id("Paris", Some("France")).unwrap(), 0);
        assert_eq!(catalog.find_city_id("Paris", Some("United States")).unwrap(), 1);
        assert_eq!(catalog.find_city_id("Lyon", None).unwrap(), 2);
    }

    #[test]
    fn ambiguous_names_follow_policy() {
        assert_eq!(cities().find_city_id("Paris", None).unwrap(), 0);

        let strict = cities().with_name_policy(NamePolicy::Strict);
        let err = strict.find_city_id("Paris", None).unwrap_err();
        assert!(matches!(err, GridError::AmbiguousName { count: 2, .. }));
        assert_eq!(strict.find_city_id("Paris", Some("France")).unwrap(), 0);
    }

    #[test]
    fn lookups_are_exact_and_case_sensitive() {
        let catalog = cities();
        assert!(matches!(catalog.find_city_id("paris", None), Err(GridError::NotFound(_))));
        assert!(matches!(catalog.find_city_id("Lyon", Some("Spain")), Err(GridError::NotFound(_))));
    }

    #[test]
    fn country_lookup_on_city_catalog_is_rejected() {
        assert!(matches!(cities().find_country_id("France"), Err(GridError::SchemaMismatch { .. })));
    }

    #[test]
    fn loads_geojson_countries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.geojson");
        std::fs::write(&path, serde_json::to_vec(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "COUNTRY": "Westland", "AREA": 1.0 },
                  "geometry": { "type": "Polygon", "coordinates": [[[-10, 0], [0, 0], [0, 10], [-10, 10], [-10, 0]]] } },
                { "type": "Feature", "properties": { "COUNTRY": "Eastland" },
                  "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]] } }
            ]
        })).unwrap()).unwrap();

        let catalog = PlaceCatalog::load_countries(&path).unwrap();
        assert_eq!(catalog.layer(), PlaceLayer::Country);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find_country_id("Eastland").unwrap(), 1);
        assert_eq!(catalog.get(0).unwrap().country, None);
    }

    #[test]
    fn missing_source_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PlaceCatalog::load_cities(&dir.path().join("World_Cities.shp")).unwrap_err();
        assert!(matches!(missing, GridError::SourceNotFound(_)));

        let path = dir.path().join("cities.geojson");
        std::fs::write(&path, serde_json::to_vec(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "CITY_NAME": "Nowhere" },
                  "geometry": { "type": "Point", "coordinates": [0, 0] } }
            ]
        })).unwrap()).unwrap();

        let err = PlaceCatalog::load_cities(&path).unwrap_err();
        assert!(matches!(err, GridError::SchemaMismatch { .. }));
        assert!(err.is_data_error());
    }

    #[test]
    fn written_catalog_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.geojson");

        let catalog = PlaceCatalog::from_features(PlaceLayer::City, vec![
            ("Quito".to_string(), Some("Ecuador".to_string()), PlaceGeometry::Point(Point::new(-78.5, -0.2))),
            ("Block".to_string(), Some("Nowhere".to_string()), square(0.0, 0.0, 1.0)),
        ]);
        catalog.write_geojson(&path).unwrap();

        let loaded = PlaceCatalog::load_cities(&path).unwrap();
        assert_eq!(loaded.features(), catalog.features());
    }

    /// Write a shapefile whose dbf has one character field per entry of `fields`.
    fn write_shapefile<S: shapefile::record::EsriShape>(path: &Path, fields: &[&str], rows: Vec<(S, Vec<&str>)>) {
        let table = fields.iter().fold(shapefile::dbase::TableWriterBuilder::new(), |builder, &field| {
            builder.add_character_field(field.try_into().unwrap(), 40)
        });
        let mut writer = shapefile::Writer::from_path(path, table).unwrap();
        for (shape, values) in rows {
            let mut record = shapefile::dbase::Record::default();
            for (&field, value) in fields.iter().zip(values) {
                record.insert(field.to_string(), shapefile::dbase::FieldValue::Character(Some(value.to_string())));
            }
            writer.write_shape_and_record(&shape, &record).unwrap();
        }
    }

    fn shp_square(x0: f64, y0: f64, size: f64) -> shapefile::Polygon {
        shapefile::Polygon::new(shapefile::PolygonRing::Outer(vec![
            shapefile::Point::new(x0, y0),
            shapefile::Point::new(x0, y0 + size),
            shapefile::Point::new(x0 + size, y0 + size),
            shapefile::Point::new(x0 + size, y0),
            shapefile::Point::new(x0, y0),
        ]))
    }

    #[test]
    fn loads_shapefile_countries_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.shp");
        write_shapefile(&path, &["COUNTRY", "ISO"], vec![
            (shp_square(-10.0, 0.0, 10.0), vec!["Westland", "WL"]),
            (shp_square(0.0, 0.0, 10.0), vec!["Eastland ", "EL"]),
        ]);

        let catalog = PlaceCatalog::load_countries(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().name, "Westland");
        assert_eq!(catalog.find_country_id("Eastland").unwrap(), 1);
        assert_eq!(catalog.get(1).unwrap().country, None);

        let west = &catalog.get(0).unwrap().geometry;
        assert!(west.covers_point(-5.0, 5.0));
        assert!(!west.covers_point(5.0, 5.0));
    }

    #[test]
    fn loads_shapefile_cities_with_countries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("World_Cities.shp");
        write_shapefile(&path, &["CITY_NAME", "CNTRY_NAME"], vec![
            (shapefile::Point::new(2.35, 48.85), vec!["Paris", "France"]),
            (shapefile::Point::new(-95.55, 33.66), vec!["Paris", "United States"]),
        ]);

        let catalog = PlaceCatalog::load_cities(&path).unwrap();
        assert_eq!(catalog.get(1).unwrap().country.as_deref(), Some("United States"));
        assert_eq!(catalog.get(0).unwrap().geometry, PlaceGeometry::Point(Point::new(2.35, 48.85)));
        assert_eq!(catalog.find_city_id("Paris", Some("United States")).unwrap(), 1);
    }

    #[test]
    fn shapefile_without_expected_columns_is_a_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();

        let cities = dir.path().join("cities.shp");
        write_shapefile(&cities, &["CITY_NAME"], vec![(shapefile::Point::new(0.0, 0.0), vec!["Nowhere"])]);
        let err = PlaceCatalog::load_cities(&cities).unwrap_err();
        assert!(matches!(&err, GridError::SchemaMismatch { detail, .. } if detail.contains("CNTRY_NAME")));

        let countries = dir.path().join("countries.shp");
        write_shapefile(&countries, &["NAME"], vec![(shp_square(0.0, 0.0, 1.0), vec!["Nowhere"])]);
        let err = PlaceCatalog::load_countries(&countries).unwrap_err();
        assert!(matches!(&err, GridError::SchemaMismatch { detail, .. } if detail.contains("COUNTRY")));
    }
}
