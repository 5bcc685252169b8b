//! HTML sanitization for rendered markdown
//!
//! An allow-list of tags, attributes and URL schemes decides what survives;
//! everything else is dropped. `<iframe>` survives only when its `src` is an
//! https video embed from an allow-listed host.

use ammonia::Builder as AmmoniaBuilder;
use lazy_static::lazy_static;
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;

lazy_static! {
    static ref EMBED_ALLOW_LIST: Vec<Regex> = vec![
        Regex::new(r"^https://(www\.)?youtube(-nocookie)?\.com/embed/[A-Za-z0-9_-]+([?#][^\s]*)?$")
            .unwrap(),
        Regex::new(r"^https://player\.vimeo\.com/video/[0-9]+([?#][^\s]*)?$").unwrap(),
    ];
    static ref SANITIZER: AmmoniaBuilder<'static> = build_sanitizer();
}

/// Style fragments that can load resources or run code
const FORBIDDEN_STYLE: [&str; 7] = [
    "url(",
    "expression(",
    "javascript:",
    "vbscript:",
    "@import",
    "behavior:",
    "-moz-binding",
];

#[derive(Debug, thiserror::Error)]
#[error("sanitization failed: {0}")]
pub struct SanitizeError(#[from] lol_html::errors::RewritingError);

/// Whether an iframe `src` points at an allow-listed video embed
pub fn is_allowed_embed(src: &str) -> bool {
    let src = src.trim();
    EMBED_ALLOW_LIST.iter().any(|re| re.is_match(src))
}

/// Sanitize rendered HTML
pub fn sanitize(html: &str) -> Result<String, SanitizeError> {
    let clean = SANITIZER.clean(html).to_string();
    finish_embeds(&clean)
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "iframe",
        "img",
        "input",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    // Removed together with everything inside them
    let dropped: HashSet<&'static str> = HashSet::from([
        "embed",
        "noembed",
        "noframes",
        "noscript",
        "object",
        "plaintext",
        "script",
        "style",
        "textarea",
        "title",
        "xmp",
    ]);
    builder.clean_content_tags(dropped);

    let generic: HashSet<&'static str> = HashSet::from(["class", "id", "title", "lang"]);
    builder.generic_attributes(generic);

    builder.link_rel(None);
    builder.add_tag_attributes("a", &["rel", "target"]);
    builder.add_tag_attributes("img", &["title", "width", "height", "alt", "loading", "decoding"]);
    builder.add_tag_attributes("pre", &["style"]);
    builder.add_tag_attributes("span", &["style"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("th", &["style"]);
    builder.add_tag_attributes("td", &["style"]);
    builder.add_tag_attributes(
        "iframe",
        &[
            "src",
            "width",
            "height",
            "allow",
            "allowfullscreen",
            "frameborder",
        ],
    );

    builder.url_schemes(HashSet::from(["http", "https", "mailto", "tel"]));

    builder.attribute_filter(|element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            is_safe_style(value).then_some(Cow::Borrowed(value))
        } else if element == "iframe" && attribute == "src" {
            is_allowed_embed(value).then_some(Cow::Borrowed(value))
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

fn is_safe_style(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    !FORBIDDEN_STYLE.iter().any(|needle| lower.contains(needle))
}

/// Drop iframes that lost their `src`, lazy-load the rest
fn finish_embeds(html: &str) -> Result<String, SanitizeError> {
    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("iframe", |el| {
                if el.get_attribute("src").is_some() {
                    el.set_attribute("loading", "lazy")?;
                    el.set_inner_content("", ContentType::Text);
                } else {
                    el.remove();
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_script_elements() {
        let html = "<p>before</p><script>alert(1)</script><SCRIPT src=\"x.js\"></SCRIPT><p>after</p>";
        let clean = sanitize(html).unwrap();
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(!clean.contains("alert(1)"));
        assert!(clean.contains("<p>before</p>"));
        assert!(clean.contains("<p>after</p>"));
    }

    #[test]
    fn test_removes_raw_text_containers() {
        for html in [
            "<textarea><script>alert(3)</script></textarea>",
            "<xmp><script>alert(3)</script></xmp>",
            "<noembed><script>alert(3)</script></noembed>",
            "<noframes><script>alert(3)</script></noframes>",
            "<noscript><script>alert(3)</script></noscript>",
            "<title><script>alert(3)</script></title>",
            "<style>body { background: red }</style>",
            "<plaintext><script>alert(3)</script>",
        ] {
            let clean = sanitize(&format!("<p>kept</p>{}", html)).unwrap();
            assert!(!clean.to_lowercase().contains("<script"), "{} -> {}", html, clean);
            assert!(!clean.contains("alert(3)"), "{} -> {}", html, clean);
            assert!(!clean.contains("background"), "{} -> {}", html, clean);
            assert!(clean.contains("<p>kept</p>"));
        }
    }

    #[test]
    fn test_removes_event_handlers() {
        let html = r#"<img src="a.png" onerror="alert(1)" alt="a"><div ONCLICK="x()" class="box">hi</div>"#;
        let clean = sanitize(html).unwrap();
        assert!(!clean.to_lowercase().contains("onerror"));
        assert!(!clean.to_lowercase().contains("onclick"));
        assert!(clean.contains(r#"class="box""#));
        assert!(clean.contains(r#"src="a.png""#));
    }

    #[test]
    fn test_removes_script_urls() {
        let html = r#"<a href=" JavaScript:alert(1)">x</a><a href="https://example.com">ok</a>"#;
        let clean = sanitize(html).unwrap();
        assert!(!clean.to_lowercase().contains("javascript:"));
        assert!(clean.contains(r#"href="https://example.com""#));
    }

    #[test]
    fn test_removes_entity_encoded_script_urls() {
        for html in [
            r#"<a href="jav&#x61;script:alert(1)">x</a>"#,
            r#"<a href="&#106;avascript:alert(1)">x</a>"#,
            r#"<a href="javascript&colon;alert(1)">x</a>"#,
            r#"<a href="java&#9;script:alert(1)">x</a>"#,
            r#"<img src="&#x6A;avascript:alert(1)" alt="x">"#,
            r#"<a href="data:text/html;base64,PHNjcmlwdD5hbGVydCgxKTwvc2NyaXB0Pg==">x</a>"#,
        ] {
            let clean = sanitize(html).unwrap();
            let lower = clean.to_lowercase();
            assert!(!lower.contains("href="), "{} -> {}", html, clean);
            assert!(!lower.contains("src="), "{} -> {}", html, clean);
            assert!(!lower.contains("alert(1)"), "{} -> {}", html, clean);
        }
    }

    #[test]
    fn test_removes_svg_animation() {
        let html = r#"<svg><a><animate attributeName="href" values="javascript:alert(1)"/><text x="20" y="20">Click</text></a></svg>"#;
        let clean = sanitize(html).unwrap();
        let lower = clean.to_lowercase();
        assert!(!lower.contains("<svg"));
        assert!(!lower.contains("<animate"));
        assert!(!lower.contains("javascript"));
    }

    #[test]
    fn test_keeps_rendered_markup() {
        let html = concat!(
            r#"<a class="cta-button" href="https://shop.example.com/w" rel="nofollow sponsored noopener noreferrer" target="_blank">Buy</a>"#,
            r#"<img src="/img/w.png" alt="Widget" loading="lazy" decoding="async">"#,
            r#"<figure class="highlight rust"><pre style="background-color:#2b303b;"><span style="color:#c0c5ce;">fn</span></pre></figure>"#,
        );
        let clean = sanitize(html).unwrap();
        assert!(clean.contains(r#"rel="nofollow sponsored noopener noreferrer""#));
        assert!(clean.contains(r#"target="_blank""#));
        assert!(clean.contains(r#"loading="lazy""#));
        assert!(clean.contains(r#"<figure class="highlight rust">"#));
        assert!(clean.contains(r#"<span style="color:#c0c5ce;">"#));
    }

    #[test]
    fn test_drops_unsafe_styles() {
        let html = r#"<span style="background: url(https://evil.example.com/x.png)">a</span><span style="color:red">b</span>"#;
        let clean = sanitize(html).unwrap();
        assert!(!clean.contains("evil.example.com"));
        assert!(clean.contains(r#"style="color:red""#));
    }

    #[test]
    fn test_iframe_allow_list() {
        let allowed = r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe>"#;
        let clean = sanitize(allowed).unwrap();
        assert!(clean.contains("youtube.com/embed/dQw4w9WgXcQ"));
        assert!(clean.contains(r#"loading="lazy""#));

        let vimeo = r#"<iframe src="https://player.vimeo.com/video/12345?autoplay=0"></iframe>"#;
        assert!(sanitize(vimeo).unwrap().contains("<iframe"));

        for src in [
            "https://evil.example.com/embed/x",
            "http://www.youtube.com/embed/abc",
            "https://www.youtube.com.evil.io/embed/abc",
            "https://www.youtube.com/watch?v=abc",
        ] {
            let html = format!(r#"<p>a</p><iframe src="{}">fallback</iframe><p>b</p>"#, src);
            let clean = sanitize(&html).unwrap();
            assert!(!clean.contains("<iframe"), "iframe kept for {}", src);
            assert!(!clean.contains(src));
            assert!(clean.contains("<p>b</p>"));
        }

        let no_src = "<iframe srcdoc=\"<script>x</script>\"></iframe>";
        assert!(!sanitize(no_src).unwrap().contains("<iframe"));

        let onload = r#"<iframe src="https://www.youtube.com/embed/abc" onload="alert(1)"></iframe>"#;
        let clean = sanitize(onload).unwrap();
        assert!(clean.contains("<iframe"));
        assert!(!clean.contains("onload"));
    }
}
