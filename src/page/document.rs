//! Review and comparison pages

use super::{layout, Head};
use crate::config::SiteConfig;
use crate::content::{Document, MarkdownRenderer};
use crate::helpers::{html_escape, rating_stars, search_url, time_tag};

/// Length of the description derived from the body
const DESCRIPTION_LENGTH: usize = 160;

/// Description from front-matter, or an excerpt of the body
pub fn description_for(doc: &Document) -> String {
    match doc.meta.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => MarkdownRenderer::excerpt(&doc.body, DESCRIPTION_LENGTH),
    }
}

/// Full page for a review; `content_html` is the rendered body
pub fn review_page(site: &SiteConfig, doc: &Document, content_html: &str) -> String {
    let mut article = header(doc);
    article.push_str(r#"<div class="content">"#);
    article.push_str(content_html);
    article.push_str("</div>\n");
    article.push_str(&affiliate_cta(doc, "Check price"));
    article.push_str(&terms(doc));

    wrap(site, doc, "review", &article)
}

/// Full page for a comparison, with the compared products listed up front
pub fn comparison_page(site: &SiteConfig, doc: &Document, content_html: &str) -> String {
    let mut article = header(doc);

    if !doc.meta.products.is_empty() {
        article.push_str("<section class=\"products\">\n<h2>Compared</h2>\n<ul>\n");
        for product in &doc.meta.products {
            article.push_str(&format!("<li>{}</li>\n", html_escape(product)));
        }
        article.push_str("</ul>\n</section>\n");
    }

    article.push_str(r#"<div class="content">"#);
    article.push_str(content_html);
    article.push_str("</div>\n");
    article.push_str(&affiliate_cta(doc, "See the winner"));
    article.push_str(&terms(doc));

    wrap(site, doc, "comparison", &article)
}

fn wrap(site: &SiteConfig, doc: &Document, class: &str, article: &str) -> String {
    let head = Head {
        title: doc.title(),
        description: description_for(doc),
        path: doc.url_path(),
        image: doc.meta.image.clone().filter(|image| is_http_url(image)),
        og_type: "article",
    };
    let body = format!("<article class=\"{}\">\n{}</article>", class, article);
    layout(site, &head, &body)
}

fn header(doc: &Document) -> String {
    let mut html = format!(
        "<header>\n<p class=\"kind\">{}</p>\n<h1>{}</h1>\n",
        doc.collection.label(),
        html_escape(&doc.title())
    );

    let mut meta = Vec::new();
    if let Some(author) = doc.meta.author.as_deref().filter(|a| !a.trim().is_empty()) {
        meta.push(format!("By {}", html_escape(author.trim())));
    }
    if let Some(date) = doc.meta.parse_date() {
        meta.push(time_tag(&date));
    }
    if let Some(updated) = doc.meta.parse_updated() {
        meta.push(format!("Updated {}", time_tag(&updated)));
    }
    if !meta.is_empty() {
        html.push_str(&format!("<p class=\"meta\">{}</p>\n", meta.join(" &middot; ")));
    }

    if let Some(rating) = doc.meta.rating {
        html.push_str(&rating_stars(rating));
        html.push('\n');
    }

    if let Some(image) = doc.meta.image.as_deref().filter(|image| is_http_url(image)) {
        html.push_str(&format!(
            "<img class=\"hero\" src=\"{}\" alt=\"{}\" loading=\"lazy\" decoding=\"async\">\n",
            html_escape(image),
            html_escape(&doc.title())
        ));
    }

    html.push_str("</header>\n");
    html
}

/// Call-to-action button for the affiliate link, if there is a usable one
fn affiliate_cta(doc: &Document, text: &str) -> String {
    match doc.meta.affiliate_url.as_deref().map(str::trim) {
        Some(url) if is_http_url(url) => format!(
            "<p class=\"cta\"><a class=\"cta-button\" href=\"{}\" rel=\"nofollow sponsored noopener noreferrer\" target=\"_blank\">{}</a></p>\n",
            html_escape(url),
            html_escape(text)
        ),
        _ => String::new(),
    }
}

fn terms(doc: &Document) -> String {
    let links: Vec<String> = doc
        .meta
        .categories
        .iter()
        .chain(doc.meta.tags.iter())
        .filter(|term| !term.trim().is_empty())
        .map(|term| {
            format!(
                "<a href=\"{}\">{}</a>",
                html_escape(&search_url(term)),
                html_escape(term)
            )
        })
        .collect();

    if links.is_empty() {
        String::new()
    } else {
        format!("<footer class=\"terms\">Filed under {}</footer>\n", links.join(", "))
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
