//! Download job state

use chrono::{DateTime, Utc};
use osmcache_core::error::{NetworkError, ParseError};
use osmcache_core::models::{BoundingBox, Category, Crs};
use osmcache_geo::{Reproject, StudyArea};
use std::collections::BTreeMap;
use std::fmt;

/// Why a single category did not make it into the store
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Network(NetworkError),
    Parse(ParseError),
    Reprojection(String),
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Network(e) => write!(f, "{}", e),
            FailureReason::Parse(e) => write!(f, "{}", e),
            FailureReason::Reprojection(reason) => write!(f, "reprojection failed: {}", reason),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryState {
    Pending,
    Succeeded(usize),
    Failed(FailureReason),
}

/// One download run over a study area
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Query bbox in EPSG:4326
    pub bbox: BoundingBox,
    pub target_crs: Crs,
    states: BTreeMap<Category, CategoryState>,
    order: Vec<Category>,
}

impl DownloadJob {
    /// Build a job directly from a bbox; duplicate categories are ignored
    pub fn new(bbox: BoundingBox, categories: &[Category], target_crs: Crs) -> Self {
        let mut order = Vec::new();
        for category in categories {
            if !order.contains(category) {
                order.push(*category);
            }
        }
        let states = order.iter().map(|c| (*c, CategoryState::Pending)).collect();
        Self { bbox, target_crs, states, order }
    }

    /// Job for a study area, with its bbox transformed to EPSG:4326
    pub fn for_study_area(
        study_area: &StudyArea,
        categories: &[Category],
        reprojector: &dyn Reproject,
    ) -> osmcache_core::Result<Self> {
        let bbox = study_area.download_bbox(reprojector)?;
        Ok(Self::new(bbox, categories, study_area.crs().clone()))
    }

    /// Requested categories in request order
    pub fn categories(&self) -> &[Category] {
        &self.order
    }

    pub fn state(&self, category: Category) -> Option<&CategoryState> {
        self.states.get(&category)
    }

    pub fn set_state(&mut self, category: Category, state: CategoryState) {
        self.states.insert(category, state);
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.states.iter().filter_map(|(c, s)| match s {
            CategoryState::Succeeded(n) => Some((*c, *n)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (Category, &FailureReason)> + '_ {
        self.states.iter().filter_map(|(c, s)| match s {
            CategoryState::Failed(reason) => Some((*c, reason)),
            _ => None,
        })
    }
}

/// Result of a download that committed at least one category
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub source_timestamp: DateTime<Utc>,
    pub counts: BTreeMap<Category, usize>,
    pub failed: Vec<(Category, FailureReason)>,
    pub generation: u64,
}

impl DownloadOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}
