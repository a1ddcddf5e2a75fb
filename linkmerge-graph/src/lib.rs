pub mod builder;
pub mod error;
pub mod graph;
pub mod key;
pub mod metrics;
pub mod page;
pub mod reducer;
pub mod result;
pub mod schedule;
pub mod scoring;
pub mod store;
pub mod updater;

pub use builder::GraphBuilder;
pub use error::GraphError;
pub use graph::{GraphFragment, WebEdge, WebGraph, WebVertex};
pub use key::{GroupKey, normalize_url, reverse_url, unreverse_url};
pub use metrics::{Counter, CounterSnapshot, DepthBucket, MergeCounters};
pub use page::{DISTANCE_INFINITE, Mark, Marks, WebPage};
pub use reducer::OutGraphReducer;
pub use result::MergeResult;
pub use schedule::{DefaultFetchSchedule, FetchSchedule};
pub use scoring::{ScoringConfig, ScoringFilter, ScoringFilters};
pub use store::{MemoryPageStore, PageStore};
pub use updater::GraphUpdater;
