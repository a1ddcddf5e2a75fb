// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{format_page, init_workspace, load_config, parse_scoring_list, resolve_config_dir};

// Re-export merge functionality from linkmerge-core
pub use linkmerge_core::merge::{MergeOptions, MergeProgressCallback, MergeSummary, execute_merge, run_merge_cycle};
