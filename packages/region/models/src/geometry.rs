//! Level-tagged boundary geometry.
//!
//! Boundary features are always carried together with the level they
//! were fetched for, so consumers can refuse to join one level's shapes
//! with another level's values.

use geo::BoundingRect;
use geojson::{Feature, JsonValue};

use crate::{BoundingBox, RegionLevel};

/// The features of one level's boundary file.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGeometry {
    /// Level the features belong to.
    pub level: RegionLevel,
    /// Boundary features in file order.
    pub features: Vec<Feature>,
}

impl LevelGeometry {
    #[must_use]
    pub const fn new(level: RegionLevel, features: Vec<Feature>) -> Self {
        Self { level, features }
    }

    /// Returns `true` if this geometry was loaded for `level`.
    #[must_use]
    pub fn matches(&self, level: RegionLevel) -> bool {
        self.level == level
    }
}

/// Reads a string property from a feature.
///
/// Numeric codes are stringified so that numerically typed code columns
/// still match.
#[must_use]
pub fn string_property(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Bounding box of a single feature's geometry.
///
/// Returns `None` for features without geometry, geometry that does not
/// convert, or an extent outside WGS84 ranges.
#[must_use]
pub fn feature_bbox(feature: &Feature) -> Option<BoundingBox> {
    let geometry = feature.geometry.clone()?;
    let geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    let rect = geom.bounding_rect()?;
    let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    bbox.is_valid().then_some(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Geometry, Value};

    fn square(code: &str, x: f64, y: f64, size: f64) -> Feature {
        let ring = vec![
            vec![x, y],
            vec![x + size, y],
            vec![x + size, y + size],
            vec![x, y + size],
            vec![x, y],
        ];
        let mut feature = Feature {
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            ..Feature::default()
        };
        feature.set_property("code", code);
        feature
    }

    #[test]
    fn bbox_of_polygon() {
        let f = square("A", -2.0, 51.0, 1.0);
        assert_eq!(
            feature_bbox(&f),
            Some(BoundingBox::new(-2.0, 51.0, -1.0, 52.0))
        );
    }

    #[test]
    fn bbox_out_of_range_is_none() {
        let f = square("A", 400_000.0, 150_000.0, 10.0);
        assert_eq!(feature_bbox(&f), None);
    }

    #[test]
    fn geometry_knows_its_level() {
        let geometry = LevelGeometry::new(RegionLevel::Itl1, vec![square("A", -3.0, 50.0, 1.0)]);
        assert!(geometry.matches(RegionLevel::Itl1));
        assert!(!geometry.matches(RegionLevel::Lad));
    }

    #[test]
    fn numeric_code_property() {
        let mut f = Feature::default();
        f.set_property("code", 42);
        assert_eq!(string_property(&f, "code").as_deref(), Some("42"));
        assert_eq!(string_property(&f, "missing"), None);
    }
}
