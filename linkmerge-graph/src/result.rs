use crate::key::GroupKey;
use crate::page::WebPage;

/// What happened to one group key
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub key: GroupKey,
    /// The page as written to the store
    pub page: Option<WebPage>,
    pub skipped: bool,
    pub error: Option<String>,
}

impl MergeResult {
    pub fn persisted(key: GroupKey, page: WebPage) -> Self {
        Self {
            key,
            page: Some(page),
            skipped: false,
            error: None,
        }
    }

    pub fn skipped(key: GroupKey) -> Self {
        Self {
            key,
            page: None,
            skipped: true,
            error: None,
        }
    }

    pub fn with_error(key: GroupKey, error: String) -> Self {
        Self {
            key,
            page: None,
            skipped: true,
            error: Some(error),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
