pub mod analytics;
pub mod client;
pub mod filter;
pub mod import;
pub mod memory;
pub mod pipeline;
pub mod predicate;
pub mod reader;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use analytics::InsightAnalytics;
pub use client::MongoClient;
pub use filter::{build_filter, FilterParams};
pub use memory::MemoryInsightStore;
pub use pipeline::{Accumulator, Grouping, Pipeline, Sort, SortOrder};
pub use predicate::{Condition, Predicate};
pub use reader::MongoInsightStore;
pub use store::{FindOptions, InsightStore, Projection};
