//! Details aggregation: size, file count and last modification of a path.

pub mod aggregator;
pub mod resolver;
pub mod summary;

pub use aggregator::Aggregator;
pub use resolver::CommitDateResolver;
pub use summary::{merge, Details, Summary};
