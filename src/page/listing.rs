//! Homepage, collection listing and search result pages

use super::{layout, Head};
use crate::config::SiteConfig;
use crate::content::{title_from_slug, Collection};
use crate::helpers::html_escape;

/// One linked document on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub collection: Collection,
    pub slug: String,
    pub title: String,
}

impl ListingEntry {
    /// Entry titled after its slug
    pub fn new(collection: Collection, slug: &str) -> Self {
        Self {
            collection,
            slug: slug.to_string(),
            title: title_from_slug(slug),
        }
    }

    pub fn url_path(&self) -> String {
        self.collection.url_path(&self.slug)
    }
}

/// Listing of documents grouped by collection
///
/// With `query` set the page doubles as the search page: the form is
/// pre-filled and an empty result says so.
pub fn listing_page(
    site: &SiteConfig,
    heading: &str,
    path: &str,
    entries: &[ListingEntry],
    query: Option<&str>,
) -> String {
    let mut body = format!("<h1>{}</h1>\n", html_escape(heading));

    if let Some(query) = query {
        body.push_str(&format!(
            "<form class=\"search\" action=\"/search\" method=\"get\">\n<input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search reviews\">\n<button type=\"submit\">Search</button>\n</form>\n",
            html_escape(query)
        ));
    }

    if entries.is_empty() {
        let message = match query {
            Some(query) if !query.trim().is_empty() => {
                format!("No results for &ldquo;{}&rdquo;.", html_escape(query.trim()))
            }
            Some(_) => "Type a product or brand to search.".to_string(),
            None => "Nothing published yet.".to_string(),
        };
        body.push_str(&format!("<p class=\"empty\">{}</p>\n", message));
    }

    for collection in Collection::ALL {
        let group: Vec<&ListingEntry> = entries
            .iter()
            .filter(|entry| entry.collection == collection)
            .collect();
        if group.is_empty() {
            continue;
        }

        body.push_str(&format!(
            "<section class=\"listing {}\">\n<h2>{}s</h2>\n<ul>\n",
            collection,
            collection.label()
        ));
        for entry in group {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                html_escape(&entry.url_path()),
                html_escape(&entry.title)
            ));
        }
        body.push_str("</ul>\n</section>\n");
    }

    let head = Head::new(heading, path);
    layout(site, &head, &body)
}
