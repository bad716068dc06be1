//! Raw Overpass JSON elements
//!
//! The response envelope is parsed as a whole, each element on its own: one
//! malformed element is dropped without failing the category.

use osmcache_core::error::ParseError;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// `[x, y]` in EPSG:4326 axis order
    pub fn xy(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawWay {
    pub id: i64,
    #[serde(default)]
    pub nodes: Vec<i64>,
    /// Present with `out geom`
    #[serde(default)]
    pub geometry: Option<Vec<LatLon>>,
    /// Present with `out center`
    #[serde(default)]
    pub center: Option<LatLon>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMember {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Option<Vec<LatLon>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRelation {
    pub id: i64,
    #[serde(default)]
    pub members: Vec<RawMember>,
    #[serde(default)]
    pub center: Option<LatLon>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawElement {
    Node(RawNode),
    Way(RawWay),
    Relation(RawRelation),
}

impl RawElement {
    pub fn tags(&self) -> &HashMap<String, String> {
        match self {
            RawElement::Node(n) => &n.tags,
            RawElement::Way(w) => &w.tags,
            RawElement::Relation(r) => &r.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
    #[serde(default)]
    remark: Option<String>,
}

/// Elements of one response
#[derive(Debug, Default)]
pub struct ParsedResponse {
    pub elements: Vec<RawElement>,
    /// Elements that could not be interpreted
    pub dropped: usize,
}

/// Parse an Overpass JSON response body
///
/// Fails only when the envelope itself is unusable, or when the server
/// reports that it aborted the query (the element list is then partial).
pub fn parse_response(body: &str) -> Result<ParsedResponse, ParseError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ParseError::new("overpass response", e.to_string()))?;

    if let Some(remark) = envelope.remark.as_deref() {
        if remark.contains("runtime error") {
            return Err(ParseError::new("overpass response", remark.to_string()));
        }
    }

    let mut parsed = ParsedResponse::default();
    for value in envelope.elements {
        match serde_json::from_value::<RawElement>(value) {
            Ok(element) => parsed.elements.push(element),
            Err(e) => {
                tracing::debug!("Dropping malformed element: {}", e);
                parsed.dropped += 1;
            }
        }
    }
    Ok(parsed)
}
