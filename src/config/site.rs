//! Site configuration (verdict.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,

    /// Content repository
    pub github: GithubConfig,

    /// Cache lifetimes
    pub cache: CacheConfig,

    /// HTTP listener
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Verdict".to_string(),
            description: "Honest product reviews and comparisons".to_string(),
            author: String::new(),
            language: "en".to_string(),
            url: "http://localhost:8787".to_string(),
            github: GithubConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// GitHub repository holding the markdown content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    /// Branch or tag to read from; the repository default when unset
    pub branch: Option<String>,
    pub reviews_dir: String,
    pub comparisons_dir: String,
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: None,
            reviews_dir: "reviews".to_string(),
            comparisons_dir: "comparisons".to_string(),
            timeout_secs: 8,
        }
    }
}

impl GithubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Read-through cache settings; TTLs are in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Raw content-store responses
    pub upstream_ttl_secs: u64,
    /// Homepage, listing and search pages
    pub listing_ttl_secs: u64,
    /// Individual review and comparison pages
    pub page_ttl_secs: u64,
    pub max_entries: Option<usize>,
    /// How often the server drops expired entries
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            upstream_ttl_secs: 5 * 60,
            listing_ttl_secs: 3 * 60 * 60,
            page_ttl_secs: 180 * 24 * 60 * 60,
            max_entries: Some(10_000),
            sweep_interval_secs: 10 * 60,
        }
    }
}

impl CacheConfig {
    pub fn upstream_ttl(&self) -> Duration {
        Duration::from_secs(self.upstream_ttl_secs)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Apply `VERDICT_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(owner) = lookup("VERDICT_GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Some(repo) = lookup("VERDICT_GITHUB_REPO") {
            self.github.repo = repo;
        }
        if let Some(branch) = lookup("VERDICT_GITHUB_BRANCH") {
            self.github.branch = Some(branch);
        }
        if let Some(url) = lookup("VERDICT_SITE_URL") {
            self.url = url;
        }
        if let Some(enabled) = lookup("VERDICT_CACHE") {
            self.cache.enabled = !matches!(enabled.as_str(), "0" | "false" | "off");
        }
    }

    /// Check the settings the content store needs
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.is_empty() || self.github.repo.is_empty() {
            anyhow::bail!(
                "github.owner and github.repo must be set (or VERDICT_GITHUB_OWNER / VERDICT_GITHUB_REPO)"
            );
        }
        Ok(())
    }
}
