//! Bounding boxes of GeoJSON objects.

use geojson::{Feature, GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::error::OpenAreasError;

/// Axis-aligned extent `[min_x, min_y, max_x, max_y]` in longitude/latitude degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl BBox {
    /// Creates a bounding box from its edges.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounding box of all coordinates of a GeoJSON object.
    ///
    /// A `bbox` member declared on the object is used as is.
    pub fn of_geojson(geojson: &GeoJson) -> Result<Self, OpenAreasError> {
        if let Some(declared) = declared_bbox(geojson) {
            return Ok(declared);
        }

        let mut acc = Accumulator::default();
        match geojson {
            GeoJson::Geometry(geometry) => acc.geometry(geometry),
            GeoJson::Feature(feature) => acc.feature(feature),
            GeoJson::FeatureCollection(collection) => {
                for feature in &collection.features {
                    acc.feature(feature);
                }
            }
        }

        acc.finish()
    }

    /// Bounding box of a single feature.
    pub fn of_feature(feature: &Feature) -> Result<Self, OpenAreasError> {
        if let Some(declared) = feature.bbox.as_deref().and_then(from_slice) {
            return Ok(declared);
        }

        let mut acc = Accumulator::default();
        acc.feature(feature);
        acc.finish()
    }

    /// Grows the box by `padding` degrees on every side.
    pub fn padded(&self, padding: f64) -> LngLatBounds {
        LngLatBounds {
            sw: [self.min_x - padding, self.min_y - padding],
            ne: [self.max_x + padding, self.max_y + padding],
        }
    }

    /// The box as south-west/north-east corners.
    pub fn bounds(&self) -> LngLatBounds {
        self.padded(0.0)
    }

    /// The box as `[min_x, min_y, max_x, max_y]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Camera bounds as south-west and north-east corners, `[[lng, lat], [lng, lat]]` when
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct LngLatBounds {
    /// South-west corner.
    pub sw: [f64; 2],
    /// North-east corner.
    pub ne: [f64; 2],
}

impl From<[[f64; 2]; 2]> for LngLatBounds {
    fn from([sw, ne]: [[f64; 2]; 2]) -> Self {
        Self { sw, ne }
    }
}

impl From<LngLatBounds> for [[f64; 2]; 2] {
    fn from(bounds: LngLatBounds) -> Self {
        [bounds.sw, bounds.ne]
    }
}

impl From<BBox> for LngLatBounds {
    fn from(bbox: BBox) -> Self {
        bbox.bounds()
    }
}

fn from_slice(bbox: &[f64]) -> Option<BBox> {
    match *bbox {
        [min_x, min_y, max_x, max_y] => Some(BBox::new(min_x, min_y, max_x, max_y)),
        // 3D boxes: [min_x, min_y, min_z, max_x, max_y, max_z]
        [min_x, min_y, _, max_x, max_y, _] => Some(BBox::new(min_x, min_y, max_x, max_y)),
        _ => None,
    }
}

fn declared_bbox(geojson: &GeoJson) -> Option<BBox> {
    let declared = match geojson {
        GeoJson::Geometry(geometry) => geometry.bbox.as_deref(),
        GeoJson::Feature(feature) => feature.bbox.as_deref(),
        GeoJson::FeatureCollection(collection) => collection.bbox.as_deref(),
    };

    declared.and_then(from_slice)
}

#[derive(Default)]
struct Accumulator {
    bbox: Option<BBox>,
}

impl Accumulator {
    fn point(&mut self, position: &[f64]) {
        let (Some(&x), Some(&y)) = (position.first(), position.get(1)) else {
            return;
        };

        self.bbox = Some(match self.bbox {
            None => BBox::new(x, y, x, y),
            Some(b) => BBox::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
        });
    }

    fn points<'a>(&mut self, positions: impl IntoIterator<Item = &'a Vec<f64>>) {
        for position in positions {
            self.point(position);
        }
    }

    fn feature(&mut self, feature: &Feature) {
        if let Some(geometry) = &feature.geometry {
            self.geometry(geometry);
        }
    }

    fn geometry(&mut self, geometry: &Geometry) {
        match &geometry.value {
            Value::Point(position) => self.point(position),
            Value::MultiPoint(positions) | Value::LineString(positions) => self.points(positions),
            Value::MultiLineString(lines) | Value::Polygon(lines) => {
                for line in lines {
                    self.points(line);
                }
            }
            Value::MultiPolygon(polygons) => {
                for ring in polygons.iter().flatten() {
                    self.points(ring);
                }
            }
            Value::GeometryCollection(geometries) => {
                for geometry in geometries {
                    self.geometry(geometry);
                }
            }
        }
    }

    fn finish(self) -> Result<BBox, OpenAreasError> {
        self.bbox.ok_or(OpenAreasError::EmptyGeometry)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> GeoJson {
        GeoJson::from_json_value(value).unwrap()
    }

    #[test]
    fn borough_bounds_with_padding() {
        let bbox = BBox::new(-75.1676, 40.2868, -75.0848, 40.3430);
        let bounds = bbox.padded(0.01);

        assert_abs_diff_eq!(bounds.sw[0], -75.1776, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.sw[1], 40.2768, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.ne[0], -75.0748, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.ne[1], 40.3530, epsilon = 1e-9);
    }

    #[test]
    fn bbox_of_feature_collection() {
        let geojson = parse(json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-75.1, 40.3], [-75.0, 40.3], [-75.0, 40.4], [-75.1, 40.3]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "MultiLineString",
                        "coordinates": [[[-75.2, 40.35], [-75.15, 40.2]]]
                    }
                },
                { "type": "Feature", "properties": {}, "geometry": null }
            ]
        }));

        let bbox = BBox::of_geojson(&geojson).unwrap();
        assert_eq!(bbox.to_array(), [-75.2, 40.2, -75.0, 40.4]);
    }

    #[test]
    fn declared_bbox_is_used() {
        let geojson = parse(json!({
            "type": "Feature",
            "bbox": [0.0, 1.0, 2.0, 3.0],
            "properties": {},
            "geometry": { "type": "Point", "coordinates": [10.0, 10.0] }
        }));

        assert_eq!(BBox::of_geojson(&geojson).unwrap().to_array(), [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_collection_has_no_bbox() {
        let geojson = parse(json!({ "type": "FeatureCollection", "features": [] }));
        assert!(matches!(
            BBox::of_geojson(&geojson),
            Err(OpenAreasError::EmptyGeometry)
        ));
    }

    #[test]
    fn bounds_serialize_as_corner_pairs() {
        let bounds = BBox::new(1.0, 2.0, 3.0, 4.0).bounds();
        assert_eq!(
            serde_json::to_value(bounds).unwrap(),
            json!([[1.0, 2.0], [3.0, 4.0]])
        );
    }
}
