//! Content store access through the GitHub Contents API
//!
//! A missing document and a failed request both surface as "not found" to
//! callers; failures are logged at `error` so outages stay visible.

use async_trait::async_trait;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::GithubConfig;

/// Characters left unescaped in a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const RAW_ACCEPT: &str = "application/vnd.github.raw+json";
const JSON_ACCEPT: &str = "application/vnd.github+json";

/// Read access to the content store
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Raw text of the document at `path`, or `None` when it cannot be read
    async fn fetch(&self, path: &str) -> Option<String>;

    /// Entries of the directory at `path`; empty when it cannot be read
    async fn list(&self, path: &str) -> Vec<DirEntry>;
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DirEntry {
    /// Slug of a markdown file entry
    pub fn markdown_slug(&self) -> Option<&str> {
        if self.kind != "file" {
            return None;
        }
        self.name.strip_suffix(".md")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("content store returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("invalid base64 content for {path}: {source}")]
    Base64 {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("content for {path} is not valid UTF-8")]
    Utf8 { path: String },
    #[error("unexpected directory listing for {path}: {source}")]
    Listing {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON envelope returned when the API does not send raw content
#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    content: String,
    encoding: Option<String>,
}

/// Content store backed by a GitHub repository
pub struct GithubSource {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    token: Option<String>,
}

impl GithubSource {
    /// Create a client for the configured repository
    pub fn new(config: &GithubConfig, token: Option<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("verdict/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Contents API URL for a repository path
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();

        let mut url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            utf8_percent_encode(&self.owner, SEGMENT),
            utf8_percent_encode(&self.repo, SEGMENT),
            encoded.join("/")
        );

        if let Some(branch) = &self.branch {
            url.push_str("?ref=");
            url.push_str(&utf8_percent_encode(branch, SEGMENT).to_string());
        }

        url
    }

    async fn get(&self, url: &str, accept: &str) -> Result<Option<bytes::Bytes>, FetchError> {
        let mut request = self.client.get(url).header("accept", accept);
        if let Some(token) = &self.token {
            request = request.header("authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Some(body))
    }

    /// Fetch a document, distinguishing "not found" from failures
    pub async fn try_fetch(&self, path: &str) -> Result<Option<String>, FetchError> {
        let url = self.contents_url(path);
        tracing::debug!("Fetching {}", url);

        match self.get(&url, RAW_ACCEPT).await? {
            Some(body) => decode_body(path, &body).map(Some),
            None => Ok(None),
        }
    }

    /// List a directory, distinguishing "not found" from failures
    pub async fn try_list(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let url = self.contents_url(path);
        tracing::debug!("Listing {}", url);

        match self.get(&url, JSON_ACCEPT).await? {
            Some(body) => serde_json::from_slice(&body).map_err(|e| FetchError::Listing {
                path: path.to_string(),
                source: e,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentSource for GithubSource {
    async fn fetch(&self, path: &str) -> Option<String> {
        match self.try_fetch(path).await {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                tracing::debug!(path, "Document not found in content store");
                None
            }
            Err(e) => {
                tracing::error!(path, error = %e, "Content store fetch failed");
                None
            }
        }
    }

    async fn list(&self, path: &str) -> Vec<DirEntry> {
        match self.try_list(path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(path, error = %e, "Content store listing failed");
                Vec::new()
            }
        }
    }
}

/// Decode a response body that is either raw text or a base64 JSON envelope
fn decode_body(path: &str, body: &[u8]) -> Result<String, FetchError> {
    let looks_like_json = body
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');

    if looks_like_json {
        if let Ok(envelope) = serde_json::from_slice::<ContentEnvelope>(body) {
            return match envelope.encoding.as_deref() {
                Some("base64") => {
                    let cleaned: String = envelope
                        .content
                        .chars()
                        .filter(|c| !c.is_ascii_whitespace())
                        .collect();
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(cleaned)
                        .map_err(|e| FetchError::Base64 {
                            path: path.to_string(),
                            source: e,
                        })?;
                    String::from_utf8(bytes).map_err(|_| FetchError::Utf8 {
                        path: path.to_string(),
                    })
                }
                _ => Ok(envelope.content),
            };
        }
    }

    String::from_utf8(body.to_vec()).map_err(|_| FetchError::Utf8 {
        path: path.to_string(),
    })
}
