//! In-memory content store for tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::SiteConfig;
use crate::content::{ContentSource, DirEntry};

pub const WIDGET_X: &str = "---\ntitle: \"Widget X\"\ncategories: [a, b]\n---\nHello **world**\n";

pub fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.github.owner = "acme".to_string();
    config.github.repo = "content".to_string();
    config
}

/// Content source serving fixed documents and counting fetches
#[derive(Default)]
pub struct MemorySource {
    documents: BTreeMap<String, String>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.documents.insert(path.to_string(), text.to_string());
        self
    }

    /// Delay every fetch, to keep concurrent requests in flight together
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch(&self, path: &str) -> Option<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.documents.get(path).cloned()
    }

    async fn list(&self, path: &str) -> Vec<DirEntry> {
        let prefix = format!("{}/", path.trim_matches('/'));
        self.documents
            .keys()
            .filter_map(|key| {
                let name = key.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| DirEntry {
                    name: name.to_string(),
                    path: key.clone(),
                    kind: "file".to_string(),
                })
            })
            .collect()
    }
}
