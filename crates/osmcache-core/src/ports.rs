//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod progress;
pub mod source;

pub use progress::{NoProgress, ProgressSink};
pub use source::ElementSource;
