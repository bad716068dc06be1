use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Point-of-interest category cached as one layer of the feature store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Schools,
    Kindergarden,
    Transportation,
    Airports,
    #[serde(alias = "leisure_and_parks")]
    LeisureParks,
    Shops,
    HigherEducation,
    FurtherEducation,
    Hospitals,
}

impl Category {
    /// Every category, in layer order
    pub const ALL: [Category; 9] = [
        Category::Schools,
        Category::Kindergarden,
        Category::Transportation,
        Category::Airports,
        Category::LeisureParks,
        Category::Shops,
        Category::HigherEducation,
        Category::FurtherEducation,
        Category::Hospitals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schools => "schools",
            Category::Kindergarden => "kindergarden",
            Category::Transportation => "transportation",
            Category::Airports => "airports",
            Category::LeisureParks => "leisure_parks",
            Category::Shops => "shops",
            Category::HigherEducation => "higher_education",
            Category::FurtherEducation => "further_education",
            Category::Hospitals => "hospitals",
        }
    }

    /// Name of the feature store layer holding this category
    pub fn layer_name(&self) -> String {
        format!("osm_{}", self.as_str())
    }

    /// Human readable label used in progress messages
    pub fn label(&self) -> &'static str {
        match self {
            Category::Schools => "Schools",
            Category::Kindergarden => "Kindergartens & Childcare",
            Category::Transportation => "Public Transport",
            Category::Airports => "Airports",
            Category::LeisureParks => "Leisure & Parks",
            Category::Shops => "Shops",
            Category::HigherEducation => "Universities",
            Category::FurtherEducation => "Colleges",
            Category::Hospitals => "Hospitals",
        }
    }

    /// Position in [`Category::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Resolve a layer name such as `osm_schools`
    pub fn from_layer_name(layer: &str) -> Option<Self> {
        layer.strip_prefix("osm_").and_then(|rest| rest.parse().ok())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "leisure_and_parks" {
            return Ok(Category::LeisureParks);
        }
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| Error::UnknownCategory { name: s.to_string() })
    }
}
