use colored::Colorize;

pub mod config;
pub mod data;
pub mod merge;
pub mod partition;
pub mod report;

pub use config::MergeConfig;
pub use data::{BatchRecord, BatchStatus, Database};
pub use merge::{
    MergeFailure, MergeOptions, MergeProgressCallback, MergeResultCallback, MergeSummary,
    execute_merge, run_merge_cycle,
};
pub use partition::{Outlink, OutlinkRecord, parse_records, partition, read_records};
pub use report::{ReportData, ReportFormat};

pub fn print_banner() {
    println!(
        "{} {}",
        "linkmerge".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_white()
    );
    println!("{}", "out-link graph merge for crawl batches".dimmed());
    println!();
}
