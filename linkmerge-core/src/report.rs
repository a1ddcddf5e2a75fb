// Report generation for a merge batch

use crate::data::Database;
use crate::merge::{MergeFailure, MergeSummary};
use linkmerge_graph::{CounterSnapshot, DepthBucket, WebPage};
use rusqlite::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRow {
    pub url: String,
    /// `None` for unreachable pages
    pub distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub inlinks: usize,
    pub score: f64,
}

impl From<&WebPage> for PageRow {
    fn from(page: &WebPage) -> Self {
        Self {
            url: page.url.clone(),
            distance: page.is_reachable().then_some(page.distance),
            referrer: page.referrer.clone(),
            inlinks: page.inlinks.len(),
            score: page.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub summary: MergeSummary,
    pub total_pages: i64,
    pub pages: Vec<PageRow>,
}

/// Collect the batch summary plus the first `page_limit` stored pages
pub fn gather_report_data(
    db: &Database,
    summary: &MergeSummary,
    page_limit: usize,
) -> Result<ReportData> {
    let total_pages = db.count_pages()?;
    let pages = db
        .list_pages(page_limit)?
        .iter()
        .map(PageRow::from)
        .collect();

    Ok(ReportData {
        summary: summary.clone(),
        total_pages,
        pages,
    })
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let summary = &data.summary;
    let counters = &summary.counters;
    let mut report = String::new();

    // Header
    report.push_str(RULE);
    report.push_str("                          LINKMERGE BATCH REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    if let Some(ref batch_id) = summary.batch_id {
        report.push_str(&format!("Batch ID:     {}\n", batch_id));
    }
    report.push_str(&format!("Started:      {}\n", format_timestamp(summary)));
    report.push_str(&format!("Duration:     {} seconds\n", summary.duration_secs()));
    report.push_str(&format!("Keys:         {}\n", summary.keys));
    report.push_str(&format!("Stored Pages: {}\n", data.total_pages));
    report.push('\n');

    report.push_str(RULE);
    report.push_str("COUNTERS\n");
    report.push_str(RULE);
    report.push('\n');
    for (name, value) in counter_rows(counters) {
        report.push_str(&format!("  {:<10} {}\n", name, value));
    }
    report.push('\n');

    report.push_str("Depth histogram:\n");
    for (bucket, count) in depth_rows(counters) {
        report.push_str(&format!("  {:<10} {}\n", bucket.as_str(), count));
    }
    report.push('\n');

    if !summary.failures.is_empty() {
        report.push_str(RULE);
        report.push_str("FAILURES\n");
        report.push_str(RULE);
        report.push('\n');
        for MergeFailure { key, error } in &summary.failures {
            report.push_str(&format!("  {}\n    {}\n", key, error));
        }
        report.push('\n');
    }

    if !data.pages.is_empty() {
        report.push_str(RULE);
        report.push_str("PAGES\n");
        report.push_str(RULE);
        report.push('\n');
        for page in &data.pages {
            report.push_str(&format!(
                "  [{}] {}  (score {:.3}, {} inlinks)\n",
                format_distance(page.distance),
                page.url,
                page.score,
                page.inlinks
            ));
            if let Some(ref referrer) = page.referrer {
                report.push_str(&format!("        via {}\n", referrer));
            }
        }
        report.push('\n');
    }

    report.push_str(RULE);
    report.push_str("                             End of Report\n");
    report.push_str(RULE);

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let summary = &data.summary;
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "linkmerge",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "batch": {
                "id": summary.batch_id,
                "start_time": summary.started_at.to_rfc3339(),
                "end_time": summary.finished_at.to_rfc3339(),
                "duration_seconds": summary.duration_secs(),
                "keys": summary.keys
            },
            "counters": summary.counters,
            "failures": summary.failures,
            "pages": {
                "total": data.total_pages,
                "listed": data.pages
            }
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let summary = &data.summary;
    let counters = &summary.counters;
    let mut report = String::new();

    report.push_str("# linkmerge batch report\n\n");
    if let Some(ref batch_id) = summary.batch_id {
        report.push_str(&format!("- **Batch:** `{}`\n", batch_id));
    }
    report.push_str(&format!("- **Started:** {}\n", format_timestamp(summary)));
    report.push_str(&format!("- **Duration:** {} s\n", summary.duration_secs()));
    report.push_str(&format!("- **Keys:** {}\n", summary.keys));
    report.push_str(&format!("- **Stored pages:** {}\n\n", data.total_pages));

    report.push_str("## Counters\n\n| Counter | Value |\n|---|---|\n");
    for (name, value) in counter_rows(counters) {
        report.push_str(&format!("| {} | {} |\n", name, value));
    }
    report.push_str("\n| Depth | Pages |\n|---|---|\n");
    for (bucket, count) in depth_rows(counters) {
        report.push_str(&format!("| {} | {} |\n", bucket.as_str(), count));
    }
    report.push('\n');

    if !summary.failures.is_empty() {
        report.push_str("## Failures\n\n");
        for failure in &summary.failures {
            report.push_str(&format!("- `{}`: {}\n", failure.key, failure.error));
        }
        report.push('\n');
    }

    if !data.pages.is_empty() {
        report.push_str("## Pages\n\n| Distance | URL | Referrer | Inlinks | Score |\n|---|---|---|---|---|\n");
        for page in &data.pages {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {:.3} |\n",
                format_distance(page.distance),
                page.url,
                page.referrer.as_deref().unwrap_or("-"),
                page.inlinks,
                page.score
            ));
        }
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn counter_rows(counters: &CounterSnapshot) -> [(&'static str, u64); 5] {
    [
        ("rows", counters.rows),
        ("persisted", counters.persisted),
        ("created", counters.created),
        ("skipped", counters.skipped),
        ("failed", counters.failed),
    ]
}

fn depth_rows(counters: &CounterSnapshot) -> Vec<(DepthBucket, u64)> {
    DepthBucket::ALL
        .iter()
        .map(|b| (*b, counters.depth.get(b).copied().unwrap_or(0)))
        .collect()
}

fn format_distance(distance: Option<u32>) -> String {
    distance.map_or_else(|| "∞".to_string(), |d| d.to_string())
}

fn format_timestamp(summary: &MergeSummary) -> String {
    summary.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
