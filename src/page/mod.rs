//! Page assembly
//!
//! Pure functions from documents and site settings to complete HTML pages.
//! Every interpolated value is escaped; rendered markdown is inserted as is
//! because it has already been sanitized.

mod document;
mod listing;

pub use document::{comparison_page, description_for, review_page};
pub use listing::{listing_page, ListingEntry};

use crate::config::SiteConfig;
use crate::helpers::{full_url_for, html_escape, meta_generator, open_graph};

/// Per-page head metadata
#[derive(Debug, Clone)]
pub struct Head {
    pub title: String,
    pub description: String,
    /// Site-relative path, used for the canonical link
    pub path: String,
    pub image: Option<String>,
    pub og_type: &'static str,
}

impl Head {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            path: path.into(),
            image: None,
            og_type: "website",
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:46rem;margin:0 auto;padding:0 1rem;line-height:1.6;color:#222}\
header.site,footer.site{display:flex;gap:1rem;align-items:baseline;padding:1rem 0}\
header.site nav a{margin-right:1rem}\
img{max-width:100%;height:auto}\
.rating{color:#e0a800;letter-spacing:.1em}\
.cta-button{display:inline-block;padding:.6rem 1.2rem;background:#0a6;color:#fff;border-radius:.3rem;text-decoration:none}\
.meta,.terms{color:#666;font-size:.9rem}\
.listing li{margin:.4rem 0}";

/// Wrap page content in the site chrome
pub fn layout(site: &SiteConfig, head: &Head, body: &str) -> String {
    let full_title = if head.title.is_empty() || head.title == site.title {
        site.title.clone()
    } else {
        format!("{} | {}", head.title, site.title)
    };
    let description = if head.description.is_empty() {
        site.description.as_str()
    } else {
        head.description.as_str()
    };
    let canonical = full_url_for(site, &head.path);

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
<link rel="canonical" href="{canonical}">
{og}
{generator}
<style>{style}</style>
</head>
<body>
<header class="site"><a class="brand" href="/"><strong>{site_title}</strong></a>
<nav><a href="/reviews">Reviews</a><a href="/search">Search</a></nav></header>
<main>
{body}
</main>
<footer class="site"><small>&copy; {site_title}{author}</small></footer>
</body>
</html>
"#,
        lang = html_escape(&site.language),
        title = html_escape(&full_title),
        description = html_escape(description),
        canonical = html_escape(&canonical),
        og = open_graph(
            head.og_type,
            &full_title,
            description,
            &canonical,
            head.image.as_deref(),
            &site.title,
        ),
        generator = meta_generator(),
        style = STYLE,
        site_title = html_escape(&site.title),
        author = if site.author.is_empty() {
            String::new()
        } else {
            format!(" &middot; {}", html_escape(&site.author))
        },
        body = body,
    )
}

/// Page served for unknown routes, missing documents and drafts
pub fn not_found_page(site: &SiteConfig, path: &str) -> String {
    let body = format!(
        r#"<section class="not-found">
<h1>Page not found</h1>
<p>Sorry, <code>{}</code> was not found. It may have moved or never existed.</p>
<p><a href="/">Back to the homepage</a> or <a href="/search">search the reviews</a>.</p>
</section>"#,
        html_escape(path)
    );
    layout(site, &Head::new("Page not found", path), &body)
}

/// Page served when rendering fails
pub fn error_page(site: &SiteConfig) -> String {
    let body = r#"<section class="error">
<h1>Something went wrong</h1>
<p>We could not render this page. Please try again in a moment.</p>
<p><a href="/">Back to the homepage</a></p>
</section>"#;
    layout(site, &Head::new("Error", "/"), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteConfig {
        SiteConfig {
            title: "Gadget <Verdicts>".to_string(),
            url: "https://example.com".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_layout_head() {
        let head = Head::new("Widget X", "/reviews/widget-x").description("Small & quiet");
        let html = layout(&site(), &head, "<p>body</p>");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Widget X | Gadget &lt;Verdicts&gt;</title>"));
        assert!(html.contains(r#"<meta name="description" content="Small &amp; quiet">"#));
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/reviews/widget-x">"#));
        assert!(html.contains(r#"<meta property="og:title""#));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn test_layout_falls_back_to_site_description() {
        let html = layout(&SiteConfig::default(), &Head::new("", "/"), "");
        assert!(html.contains("<title>Verdict</title>"));
        assert!(html.contains("Honest product reviews and comparisons"));
    }

    #[test]
    fn test_not_found_page_escapes_path() {
        let html = not_found_page(&site(), "/reviews/<script>");
        assert!(html.contains("not found"));
        assert!(html.contains("/reviews/&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_error_page() {
        let html = error_page(&site());
        assert!(html.contains("Something went wrong"));
    }
}
