use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::category::Category;
use super::geometry::Geometry;
use crate::error::ParseError;

/// OpenStreetMap element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(ElementKind::Node),
            "way" => Ok(ElementKind::Way),
            "relation" => Ok(ElementKind::Relation),
            other => Err(ParseError::new("element kind", format!("unknown kind '{}'", other))),
        }
    }
}

/// A normalized cached feature
///
/// Features carry no CRS of their own; the feature store header declares the
/// CRS of every layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Source OSM element id
    pub osm_id: i64,

    /// Source OSM element kind
    pub osm_type: ElementKind,

    pub category: Category,

    /// `name` tag, absent when the element has none
    pub name: Option<String>,

    pub geometry: Geometry,
}

impl Feature {
    /// Identity of the source element within a layer
    pub fn key(&self) -> (i64, ElementKind) {
        (self.osm_id, self.osm_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_record_fields() {
        let feature = Feature {
            osm_id: 42,
            osm_type: ElementKind::Way,
            category: Category::Shops,
            name: None,
            geometry: Geometry::point(1.0, 2.0),
        };

        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["osm_id"], 42);
        assert_eq!(value["osm_type"], "way");
        assert_eq!(value["category"], "shops");
        assert!(value["name"].is_null());
        assert_eq!(value["geometry"]["type"], "Point");
    }

    #[test]
    fn test_kind_ordering() {
        assert!(ElementKind::Node < ElementKind::Way);
        assert!(ElementKind::Way < ElementKind::Relation);
        assert_eq!("relation".parse::<ElementKind>().unwrap(), ElementKind::Relation);
        assert!("area".parse::<ElementKind>().is_err());
    }
}
