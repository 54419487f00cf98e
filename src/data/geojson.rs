use serde::{Deserialize, Serialize};

use crate::{prelude::HashMap, MapError, Result};

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

impl GeoJsonGeometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            GeoJsonGeometry::Point { .. } => "Point",
            GeoJsonGeometry::LineString { .. } => "LineString",
            GeoJsonGeometry::Polygon { .. } => "Polygon",
            GeoJsonGeometry::MultiPoint { .. } => "MultiPoint",
            GeoJsonGeometry::MultiLineString { .. } => "MultiLineString",
            GeoJsonGeometry::MultiPolygon { .. } => "MultiPolygon",
            GeoJsonGeometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Linear rings of a polygonal geometry, `None` for anything else
    pub fn rings(&self) -> Option<Vec<&[[f64; 2]]>> {
        match self {
            GeoJsonGeometry::Polygon { coordinates } => {
                Some(coordinates.iter().map(Vec::as_slice).collect())
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => Some(
                coordinates
                    .iter()
                    .flat_map(|polygon| polygon.iter().map(Vec::as_slice))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoJsonFeature {
    pub id: Option<serde_json::Value>,
    pub geometry: Option<GeoJsonGeometry>,
    pub properties: Option<HashMap<String, serde_json::Value>>,
}

impl GeoJsonFeature {
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref()?.get(key)
    }

    /// The `name` property, used to key features
    pub fn name(&self) -> Option<&str> {
        self.property("name")?.as_str()
    }
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    pub fn parse(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Dispatches on the root `type` member
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| MapError::ParseError("GeoJSON object without a type".to_string()))?
            .to_string();
        match kind.as_str() {
            "Feature" => Ok(GeoJson::Feature(serde_json::from_value(value)?)),
            "FeatureCollection" => {
                #[derive(Deserialize)]
                struct Collection {
                    #[serde(default)]
                    features: Vec<GeoJsonFeature>,
                }
                let collection: Collection = serde_json::from_value(value)?;
                Ok(GeoJson::FeatureCollection {
                    features: collection.features,
                })
            }
            "Point" | "LineString" | "Polygon" | "MultiPoint" | "MultiLineString"
            | "MultiPolygon" | "GeometryCollection" => {
                Ok(GeoJson::Geometry(serde_json::from_value(value)?))
            }
            other => Err(MapError::ParseError(format!(
                "unknown GeoJSON type '{other}'"
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GeoJson::Feature(_) => "Feature",
            GeoJson::FeatureCollection { .. } => "FeatureCollection",
            GeoJson::Geometry(geometry) => geometry.type_name(),
        }
    }
}
