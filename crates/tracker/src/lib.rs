// Viewed-status tracking core

pub mod config;
pub mod error;
pub mod fs;
pub mod registry;
pub mod scan;
pub mod snapshot;
pub mod stats;
pub mod tracker;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use error::{FsError, TrackerError};
pub use fs::{InMemoryFs, LocalFs};
pub use registry::ViewedEntry;
pub use stats::{compute_stats, AggregateStats};
pub use tracker::ViewedStatusTracker;
