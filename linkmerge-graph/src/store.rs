use crate::error::{GraphError, Result};
use crate::key::{GroupKey, reverse_url};
use crate::page::WebPage;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Key-value access to persisted pages.
///
/// A missing page is not an error: `get_or_nil` hands back a
/// [`WebPage::nil`] sentinel instead.
pub trait PageStore: Send + Sync {
    fn get_or_nil(&self, url: &str) -> Result<WebPage>;

    fn put(&self, key: &GroupKey, page: &WebPage) -> Result<()>;
}

impl<T: PageStore + ?Sized> PageStore for Arc<T> {
    fn get_or_nil(&self, url: &str) -> Result<WebPage> {
        (**self).get_or_nil(url)
    }

    fn put(&self, key: &GroupKey, page: &WebPage) -> Result<()> {
        (**self).put(key, page)
    }
}

/// In-process page store keyed by reversed URL
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: Mutex<BTreeMap<String, WebPage>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, WebPage>>> {
        self.pages
            .lock()
            .map_err(|_| GraphError::Store("memory page store lock poisoned".to_string()))
    }

    /// Seed the store with a page under its own key
    pub fn insert(&self, page: WebPage) -> Result<()> {
        let key = GroupKey::from_url(&page.url)?;
        self.put(&key, &page)
    }

    pub fn get(&self, key: &GroupKey) -> Option<WebPage> {
        self.lock().ok()?.get(key.as_str()).cloned()
    }

    pub fn pages(&self) -> Vec<(GroupKey, WebPage)> {
        self.lock()
            .map(|pages| {
                pages
                    .iter()
                    .map(|(k, p)| (GroupKey::new(k.clone()), p.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut pages) = self.lock() {
            pages.clear();
        }
    }
}

impl PageStore for MemoryPageStore {
    fn get_or_nil(&self, url: &str) -> Result<WebPage> {
        let key = reverse_url(url)?;
        Ok(self
            .lock()?
            .get(&key)
            .cloned()
            .unwrap_or_else(|| WebPage::nil(url)))
    }

    fn put(&self, key: &GroupKey, page: &WebPage) -> Result<()> {
        self.lock()?.insert(key.as_str().to_string(), page.clone());
        Ok(())
    }
}
