use crate::error::{GraphError, Result};
use crate::page::WebPage;
use chrono::{DateTime, Utc};

/// Thirty days, the usual revisit interval for a newly discovered page
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

pub trait FetchSchedule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Set the fetch-state fields of a page that was just created
    fn initialize_schedule(&self, page: &mut WebPage);
}

/// Fixed-interval schedule. New pages become due at the start of the current
/// cycle, so every page created within one batch gets the same fetch time.
pub struct DefaultFetchSchedule {
    interval_secs: u64,
    cycle_start: DateTime<Utc>,
}

impl DefaultFetchSchedule {
    pub fn new(interval_secs: u64, cycle_start: DateTime<Utc>) -> Self {
        Self {
            interval_secs,
            cycle_start,
        }
    }
}

impl FetchSchedule for DefaultFetchSchedule {
    fn name(&self) -> &'static str {
        "default"
    }

    fn initialize_schedule(&self, page: &mut WebPage) {
        page.fetch_time = Some(self.cycle_start);
        page.prev_fetch_time = None;
        page.fetch_interval_secs = self.interval_secs;
        page.fetch_retries = 0;
    }
}

pub fn fetch_schedule_from_name(
    name: &str,
    interval_secs: u64,
    cycle_start: DateTime<Utc>,
) -> Result<Box<dyn FetchSchedule>> {
    match name.trim().to_lowercase().as_str() {
        "default" => Ok(Box::new(DefaultFetchSchedule::new(interval_secs, cycle_start))),
        other => Err(GraphError::UnknownFetchSchedule(other.to_string())),
    }
}
