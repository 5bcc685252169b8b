//! verdict: a product review and comparison site served from a GitHub content repository
//!
//! Documents are markdown files with front-matter. Each request fetches the
//! document through the content store, parses and renders it, assembles a
//! full page and caches the result for a route-specific TTL.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod helpers;
pub mod page;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use bytes::Bytes;
use std::sync::Arc;

use cache::{MemoryCache, ReadThrough};
use config::SiteConfig;
use content::{is_valid_slug, Collection, ContentSource, Document, GithubSource, MarkdownRenderer};
use page::ListingEntry;

/// The verdict application: configuration plus shared collaborators
#[derive(Clone)]
pub struct Verdict {
    config: Arc<SiteConfig>,
    source: Arc<dyn ContentSource>,
    cache: ReadThrough,
    renderer: Arc<MarkdownRenderer>,
}

impl Verdict {
    /// Create an application reading from the configured GitHub repository
    pub fn new(config: SiteConfig, token: Option<String>) -> Result<Self> {
        config.validate()?;
        let source = GithubSource::new(&config.github, token)
            .context("Failed to create content store client")?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Create an application around any content source, caching per config
    pub fn with_source(config: SiteConfig, source: Arc<dyn ContentSource>) -> Self {
        let cache = if config.cache.enabled {
            let store = match config.cache.max_entries {
                Some(max) => MemoryCache::with_max_entries(max),
                None => MemoryCache::new(),
            };
            ReadThrough::new(Arc::new(store))
        } else {
            tracing::info!("Cache disabled");
            ReadThrough::disabled()
        };
        Self::with_parts(config, source, cache)
    }

    pub fn with_parts(config: SiteConfig, source: Arc<dyn ContentSource>, cache: ReadThrough) -> Self {
        Self {
            config: Arc::new(config),
            source,
            cache,
            renderer: Arc::new(MarkdownRenderer::new()),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn cache(&self) -> &ReadThrough {
        &self.cache
    }

    /// Raw text of a content-store path, through the upstream cache
    pub async fn fetch_raw(&self, path: &str) -> Option<String> {
        let source = Arc::clone(&self.source);
        let cached = self
            .cache
            .get_or_produce(&cache::document_key(path), self.config.cache.upstream_ttl(), || async move {
                source.fetch(path).await.map(Bytes::from)
            })
            .await?;

        match String::from_utf8(cached.payload.to_vec()) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(path, error = %e, "Cached document is not valid UTF-8");
                None
            }
        }
    }

    /// Fetch and parse a published document
    ///
    /// Invalid slugs are rejected before any request; drafts count as missing.
    pub async fn load_document(&self, collection: Collection, slug: &str) -> Option<Document> {
        if !is_valid_slug(slug) {
            tracing::debug!(slug, "Rejecting invalid slug");
            return None;
        }

        let path = collection.document_path(&self.config.github, slug);
        let raw = self.fetch_raw(&path).await?;
        let doc = Document::parse(collection, slug, &raw);

        if doc.meta.draft {
            tracing::debug!(path = %path, "Document is a draft");
            return None;
        }
        Some(doc)
    }

    /// Complete HTML page for a document, or `None` when it does not exist
    pub async fn render_document(&self, collection: Collection, slug: &str) -> Option<String> {
        let doc = self.load_document(collection, slug).await?;
        let content_html = self.renderer.render(&doc.body);

        let html = match collection {
            Collection::Reviews => page::review_page(&self.config, &doc, &content_html),
            Collection::Comparisons => page::comparison_page(&self.config, &doc, &content_html),
        };
        Some(html)
    }

    /// Documents of a collection, from the content-store directory listing
    pub async fn list_documents(&self, collection: Collection) -> Vec<ListingEntry> {
        let dir = collection.dir(&self.config.github).trim_matches('/').to_string();
        let source = Arc::clone(&self.source);
        let listing_dir = dir.clone();

        let cached = self
            .cache
            .get_or_produce(&cache::listing_key(&dir), self.config.cache.upstream_ttl(), || async move {
                let mut slugs: Vec<String> = source
                    .list(&listing_dir)
                    .await
                    .iter()
                    .filter_map(|entry| entry.markdown_slug())
                    .filter(|slug| is_valid_slug(slug))
                    .map(str::to_string)
                    .collect();

                // An empty listing is usually an outage; do not pin it
                if slugs.is_empty() {
                    return None;
                }
                slugs.sort();
                Some(Bytes::from(slugs.join("\n")))
            })
            .await;

        let Some(cached) = cached else {
            return Vec::new();
        };

        String::from_utf8_lossy(&cached.payload)
            .lines()
            .map(|slug| ListingEntry::new(collection, slug))
            .collect()
    }

    /// Documents of every collection
    pub async fn list_all(&self) -> Vec<ListingEntry> {
        let (mut reviews, comparisons) = tokio::join!(
            self.list_documents(Collection::Reviews),
            self.list_documents(Collection::Comparisons)
        );
        reviews.extend(comparisons);
        reviews
    }

    /// Documents whose slug contains every word of the query
    pub async fn search(&self, query: &str) -> Vec<ListingEntry> {
        let normalized = slug::slugify(query);
        let words: Vec<&str> = normalized.split('-').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return Vec::new();
        }

        self.list_all()
            .await
            .into_iter()
            .filter(|entry| {
                let slug = entry.slug.to_ascii_lowercase();
                words.iter().all(|word| slug.contains(word))
            })
            .collect()
    }

    /// Homepage with every collection
    pub async fn render_home(&self) -> RenderedListing {
        let entries = self.list_all().await;
        RenderedListing {
            html: page::listing_page(&self.config, &self.config.title, "/", &entries, None),
            entries: entries.len(),
        }
    }

    /// Listing page of a single collection
    pub async fn render_listing(&self, collection: Collection) -> RenderedListing {
        let entries = self.list_documents(collection).await;
        let heading = format!("{}s", collection.label());
        RenderedListing {
            html: page::listing_page(&self.config, &heading, collection.route_prefix(), &entries, None),
            entries: entries.len(),
        }
    }

    /// Search page; an empty query shows only the form
    pub async fn render_search(&self, query: &str) -> RenderedListing {
        let entries = self.search(query).await;
        RenderedListing {
            html: page::listing_page(&self.config, "Search", "/search", &entries, Some(query)),
            entries: entries.len(),
        }
    }
}

/// A rendered listing page and how many documents it links to
#[derive(Debug, Clone)]
pub struct RenderedListing {
    pub html: String,
    pub entries: usize,
}
