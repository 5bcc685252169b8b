//! HTML helper functions

/// Generate Open Graph meta tags
pub fn open_graph(
    og_type: &str,
    title: &str,
    description: &str,
    url: &str,
    image: Option<&str>,
    site_name: &str,
) -> String {
    let mut tags = vec![
        format!(
            r#"<meta property="og:type" content="{}">"#,
            html_escape(og_type)
        ),
        format!(
            r#"<meta property="og:title" content="{}">"#,
            html_escape(title)
        ),
        format!(r#"<meta property="og:url" content="{}">"#, html_escape(url)),
        format!(
            r#"<meta property="og:site_name" content="{}">"#,
            html_escape(site_name)
        ),
    ];

    if !description.is_empty() {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            html_escape(description)
        ));
    }

    if let Some(img) = image {
        tags.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            html_escape(img)
        ));
    }

    tags.join("\n")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="verdict {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Star rating out of five, rounded to the nearest half star
pub fn rating_stars(rating: f32) -> String {
    let halves = (rating.clamp(0.0, 5.0) * 2.0).round() as usize;
    let full = halves / 2;
    let half = halves % 2;
    let empty = 5 - full - half;

    format!(
        r#"<span class="rating" aria-label="Rated {} out of 5">{}{}{}</span>"#,
        format_rating(rating),
        "★".repeat(full),
        "⯪".repeat(half),
        "☆".repeat(empty)
    )
}

/// `4.5` stays `4.5`, `4.0` becomes `4`
pub fn format_rating(rating: f32) -> String {
    let rounded = (rating * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Truncate a string to a specified length
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");

    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s
            .chars()
            .take(length.saturating_sub(omission.chars().count()))
            .collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_graph_escapes() {
        let tags = open_graph(
            "article",
            "Tom & Jerry's \"Pick\"",
            "",
            "https://example.com/reviews/a",
            None,
            "Verdict",
        );
        assert!(tags.contains(r#"content="Tom &amp; Jerry&#39;s &quot;Pick&quot;""#));
        assert!(!tags.contains("og:description"));
        assert!(!tags.contains("og:image"));
    }

    #[test]
    fn test_rating_stars() {
        let stars = rating_stars(4.5);
        assert!(stars.contains("★★★★⯪"));
        assert!(stars.contains("Rated 4.5 out of 5"));
        assert!(rating_stars(3.0).contains("★★★☆☆"));
        assert_eq!(format_rating(4.0), "4");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello World", 8, None), "Hello...");
        assert_eq!(truncate("Hi", 10, None), "Hi");
        assert_eq!(truncate("Héllo wörld", 7, Some("…")), "Héllo…");
    }
}
