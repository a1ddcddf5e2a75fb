// Merge configuration, stored as JSON next to the page database

use chrono::{DateTime, Utc};
use linkmerge_graph::error::Result as GraphResult;
use linkmerge_graph::schedule::{DEFAULT_FETCH_INTERVAL_SECS, fetch_schedule_from_name};
use linkmerge_graph::{FetchSchedule, ScoringConfig, ScoringFilters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "linkmerge.json";
pub const DATABASE_FILE_NAME: &str = "linkmerge.db";

fn default_workers() -> usize {
    4
}

fn default_scoring_filters() -> Vec<String> {
    vec!["opic".to_string(), "depth".to_string()]
}

fn default_fetch_schedule() -> String {
    "default".to_string()
}

fn default_fetch_interval() -> u64 {
    DEFAULT_FETCH_INTERVAL_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Scoring filter chain, applied in order
    #[serde(default = "default_scoring_filters")]
    pub scoring_filters: Vec<String>,
    #[serde(default = "default_fetch_schedule")]
    pub fetch_schedule: String,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scoring_filters: default_scoring_filters(),
            fetch_schedule: default_fetch_schedule(),
            fetch_interval_secs: default_fetch_interval(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl MergeConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))
    }

    /// Defaults when the file does not exist; a malformed file is still an error
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, content)
            .map_err(|e| format!("Failed to write config {}: {}", path.display(), e))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_scoring_filters(mut self, names: Vec<String>) -> Self {
        self.scoring_filters = names;
        self
    }

    pub fn scoring_filters(&self) -> GraphResult<ScoringFilters> {
        ScoringFilters::from_names(&self.scoring_filters, &self.scoring)
    }

    pub fn fetch_schedule(&self, cycle_start: DateTime<Utc>) -> GraphResult<Box<dyn FetchSchedule>> {
        fetch_schedule_from_name(&self.fetch_schedule, self.fetch_interval_secs, cycle_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MergeConfig = serde_json::from_str(r#"{"workers": 8}"#).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.scoring_filters, vec!["opic", "depth"]);
        assert_eq!(config.fetch_schedule, "default");
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_unknown_filter_is_rejected() {
        let config = MergeConfig::default().with_scoring_filters(vec!["pagerank".to_string()]);
        assert!(config.scoring_filters().is_err());
    }

    #[test]
    fn test_workers_never_zero() {
        assert_eq!(MergeConfig::default().with_workers(0).workers, 1);
    }
}
