//! osmcache Geo - Geometry, CRS, and spatial operations
//!
//! This crate handles the geometry side of the cache: conversions to the
//! `geo` crate, reprojection, point distance, R-tree layer indexes,
//! study-area hashing and WKT I/O.

pub mod hash;
pub mod index;
pub mod models;
pub mod spatial;
pub mod study_area;
pub mod transform;
pub mod wkt_io;

pub use hash::geometry_hash;
pub use index::SpatialIndex;
pub use study_area::StudyArea;
pub use transform::{ProjReprojector, Reproject};
