pub mod category;
pub mod feature;
pub mod geometry;
pub mod metadata;

pub use category::Category;
pub use feature::{ElementKind, Feature};
pub use geometry::{BoundingBox, Crs, Geometry, GeometryType};
pub use metadata::{CacheInfo, CacheMetadata, Validity, CACHE_VERSION};
