//! Documents and their typed metadata

use chrono::{DateTime, Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::frontmatter::{FrontMatter, FrontValue};
use crate::config::GithubConfig;

/// Longest slug accepted before any request is made
const MAX_SLUG_LEN: usize = 128;

/// A content collection in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Reviews,
    Comparisons,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Reviews, Collection::Comparisons];

    /// Directory in the content repository holding this collection
    pub fn dir<'a>(&self, github: &'a GithubConfig) -> &'a str {
        match self {
            Collection::Reviews => &github.reviews_dir,
            Collection::Comparisons => &github.comparisons_dir,
        }
    }

    /// URL prefix the collection is served under
    pub fn route_prefix(&self) -> &'static str {
        match self {
            Collection::Reviews => "/reviews",
            Collection::Comparisons => "/compare",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Reviews => "Review",
            Collection::Comparisons => "Comparison",
        }
    }

    /// Path of a document within the content repository
    pub fn document_path(&self, github: &GithubConfig, slug: &str) -> String {
        let dir = self.dir(github).trim_matches('/');
        if dir.is_empty() {
            format!("{}.md", slug)
        } else {
            format!("{}/{}.md", dir, slug)
        }
    }

    /// Public URL path of a document
    pub fn url_path(&self, slug: &str) -> String {
        format!("{}/{}", self.route_prefix(), slug)
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" | "reviews" => Ok(Collection::Reviews),
            "compare" | "comparison" | "comparisons" => Ok(Collection::Comparisons),
            other => Err(format!(
                "unknown collection: {}. Available: reviews, comparisons",
                other
            )),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Reviews => f.write_str("reviews"),
            Collection::Comparisons => f.write_str("comparisons"),
        }
    }
}

/// Whether a slug is safe to turn into a content-store path
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with(['-', '_'])
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Human title derived from a slug: `widget-x` -> `Widget X`
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![value.to_string()])
            }
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// A scalar field; a list is joined with ", " rather than rejected
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = string_or_vec(deserializer)?;
    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(items.join(", ")))
    }
}

fn rating<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(deserializer)?
        .and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|r| r.is_finite() && (0.0..=5.0).contains(r)))
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar(deserializer)?
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"))
        .unwrap_or(false))
}

/// Typed view of a document's front-matter
///
/// Every field is optional. Missing or malformed values fall back to
/// defaults instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    #[serde(deserialize_with = "scalar")]
    pub title: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub description: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub date: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub updated: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub author: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub image: Option<String>,
    #[serde(deserialize_with = "rating")]
    pub rating: Option<f32>,
    #[serde(deserialize_with = "string_or_vec")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "scalar")]
    pub affiliate_url: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub products: Vec<String>,
    #[serde(deserialize_with = "flag")]
    pub draft: bool,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, FrontValue>,
}

impl PageMeta {
    /// Build typed metadata from parsed front-matter
    pub fn from_frontmatter(fm: &FrontMatter) -> Self {
        let value = match serde_json::to_value(fm) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to convert front-matter, using defaults: {}", e);
                return Self::default();
            }
        };

        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Malformed front-matter, using defaults: {}", e);
            Self::default()
        })
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<Local>> {
        self.date.as_deref().and_then(parse_date_string)
    }

    /// Parse the updated date string into a DateTime
    pub fn parse_updated(&self) -> Option<DateTime<Local>> {
        self.updated.as_deref().and_then(parse_date_string)
    }
}

/// A fetched and parsed content document
#[derive(Debug, Clone)]
pub struct Document {
    pub collection: Collection,
    pub slug: String,
    pub frontmatter: FrontMatter,
    pub meta: PageMeta,
    /// Markdown body after the front-matter block
    pub body: String,
}

impl Document {
    /// Parse raw document text; never fails
    pub fn parse(collection: Collection, slug: &str, raw: &str) -> Self {
        let (frontmatter, body) = FrontMatter::parse(raw);
        let meta = PageMeta::from_frontmatter(&frontmatter);
        Self {
            collection,
            slug: slug.to_string(),
            body: body.to_string(),
            frontmatter,
            meta,
        }
    }

    /// Title from front-matter, or derived from the slug
    pub fn title(&self) -> String {
        match self.meta.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => title_from_slug(&self.slug),
        }
    }

    pub fn url_path(&self) -> String {
        self.collection.url_path(&self.slug)
    }
}

/// Parse a date string in various formats
fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.and_local_timezone(Local).earliest();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0)?.and_local_timezone(Local).earliest();
        }
    }

    // Try RFC 3339 / ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_from_frontmatter() {
        let raw = "---\ntitle: \"Widget X\"\ncategories: [a, b]\ntags: gadgets\nrating: 4.5\nsku: WX-1\n---\nHello";
        let doc = Document::parse(Collection::Reviews, "widget-x", raw);

        assert_eq!(doc.meta.title.as_deref(), Some("Widget X"));
        assert_eq!(doc.meta.categories, vec!["a", "b"]);
        assert_eq!(doc.meta.tags, vec!["gadgets"]);
        assert_eq!(doc.meta.rating, Some(4.5));
        assert!(!doc.meta.draft);
        assert_eq!(doc.meta.extra.get("sku"), Some(&FrontValue::from("WX-1")));
        assert_eq!(doc.body, "Hello");
    }

    #[test]
    fn test_malformed_fields_degrade() {
        let raw = "---\ntitle: [one, two]\nrating: lots\ndraft: yes\ncategories:\n---\n";
        let doc = Document::parse(Collection::Reviews, "x", raw);

        assert_eq!(doc.meta.title.as_deref(), Some("one, two"));
        assert_eq!(doc.meta.rating, None);
        assert!(doc.meta.draft);
        assert!(doc.meta.categories.is_empty());
    }

    #[test]
    fn test_rating_out_of_range_is_dropped() {
        let raw = "---\nrating: 11\n---\n";
        let doc = Document::parse(Collection::Reviews, "x", raw);
        assert_eq!(doc.meta.rating, None);
    }

    #[test]
    fn test_title_falls_back_to_slug() {
        let doc = Document::parse(Collection::Comparisons, "widget-x_vs-gizmo", "No front-matter");
        assert_eq!(doc.title(), "Widget X Vs Gizmo");
        assert_eq!(doc.body, "No front-matter");

        let doc = Document::parse(Collection::Reviews, "widget-x", "---\ntitle: \"  \"\n---\n");
        assert_eq!(doc.title(), "Widget X");
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("widget-x"));
        assert!(is_valid_slug("best_vacuums-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("../secrets"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug(&"a".repeat(MAX_SLUG_LEN + 1)));
    }

    #[test]
    fn test_document_path() {
        let github = GithubConfig::default();
        assert_eq!(
            Collection::Reviews.document_path(&github, "widget-x"),
            "reviews/widget-x.md"
        );
        assert_eq!(Collection::Comparisons.url_path("a-vs-b"), "/compare/a-vs-b");
        assert_eq!("compare".parse::<Collection>(), Ok(Collection::Comparisons));
        assert!("posts".parse::<Collection>().is_err());
    }

    #[test]
    fn test_parse_date() {
        let meta = PageMeta {
            date: Some("2024-01-15 10:30:00".to_string()),
            ..Default::default()
        };

        let dt = meta.parse_date().unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");

        let meta = PageMeta {
            date: Some("2024/02/03".to_string()),
            ..Default::default()
        };
        assert_eq!(
            meta.parse_date().unwrap().format("%Y-%m-%d").to_string(),
            "2024-02-03"
        );
    }
}
