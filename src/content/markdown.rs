//! Markdown rendering with syntax highlighting and sanitization

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::sanitize;
use crate::helpers::{html_escape, truncate};

/// Link text prefix that turns a link into a call-to-action button
const BUTTON_PREFIX: &str = "button:";

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

/// Image being collected until its alt text is complete
struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

/// Link being collected until its closing tag
struct PendingLink<'a> {
    href: String,
    title: String,
    inner: Vec<Event<'a>>,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_theme("base16-ocean.dark")
    }

    /// Create with a custom highlighting theme
    pub fn with_theme(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
        }
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
    }

    /// Render markdown to sanitized HTML
    ///
    /// Never fails: unmatched syntax stays literal text, and if sanitization
    /// itself breaks the body is returned escaped.
    pub fn render(&self, markdown: &str) -> String {
        let raw = self.render_unsanitized(markdown);
        match sanitize::sanitize(&raw) {
            Ok(clean) => clean,
            Err(e) => {
                tracing::error!("Sanitizer failed, falling back to escaped text: {}", e);
                format!("<p>{}</p>", html_escape(markdown))
            }
        }
    }

    fn render_unsanitized(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options());

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;
        let mut image: Option<PendingImage> = None;
        let mut link: Option<PendingLink> = None;

        for event in parser {
            if let Some((_, code)) = code_block.as_mut() {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some((lang, code)) = code_block.take() {
                            let highlighted = self.highlight_code(&code, lang.as_deref());
                            emit(&mut events, &mut link, Event::Html(CowStr::from(highlighted)));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(pending) = image.as_mut() {
                match event {
                    Event::Text(text) | Event::Code(text) => pending.alt.push_str(&text),
                    Event::SoftBreak | Event::HardBreak => pending.alt.push(' '),
                    Event::End(TagEnd::Image) => {
                        if let Some(done) = image.take() {
                            emit(&mut events, &mut link, Event::Html(CowStr::from(image_html(&done))));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                            if lang.is_empty() {
                                None
                            } else {
                                Some(lang)
                            }
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    image = Some(PendingImage {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) => {
                    link = Some(PendingLink {
                        href: dest_url.to_string(),
                        title: title.to_string(),
                        inner: Vec::new(),
                    });
                }
                Event::End(TagEnd::Link) => {
                    if let Some(done) = link.take() {
                        events.push(Event::Html(CowStr::from(link_html(done))));
                    }
                }
                other => emit(&mut events, &mut link, other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                html_escape(lang),
                html_escape(code)
            ),
        }
    }

    /// Plain-text summary of a markdown body, at most `length` characters
    pub fn excerpt(markdown: &str, length: usize) -> String {
        let mut text = String::new();
        let mut in_code_block = false;

        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
                Event::End(TagEnd::CodeBlock) => in_code_block = false,
                Event::Text(t) | Event::Code(t) if !in_code_block => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => text.push(' '),
                _ => {}
            }
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate(&collapsed, length, None)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Push an event into the pending link if one is open, else into the output
fn emit<'a>(events: &mut Vec<Event<'a>>, link: &mut Option<PendingLink<'a>>, event: Event<'a>) {
    match link.as_mut() {
        Some(pending) => pending.inner.push(event),
        None => events.push(event),
    }
}

fn image_html(image: &PendingImage) -> String {
    let title = if image.title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, html_escape(&image.title))
    };

    format!(
        r#"<img src="{}" alt="{}"{} loading="lazy" decoding="async">"#,
        html_escape(&image.src),
        html_escape(&image.alt),
        title
    )
}

fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//")
}

/// Strip the button prefix from the first text event, if present
fn take_button_prefix(inner: &mut [Event]) -> bool {
    let Some(Event::Text(text)) = inner.first_mut() else {
        return false;
    };

    let trimmed = text.trim_start();
    let is_button = trimmed
        .get(..BUTTON_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BUTTON_PREFIX));

    if is_button {
        let label = trimmed[BUTTON_PREFIX.len()..].trim_start().to_string();
        *text = CowStr::from(label);
    }
    is_button
}

fn link_html(mut link: PendingLink) -> String {
    let is_button = take_button_prefix(&mut link.inner);

    let mut label = String::new();
    html::push_html(&mut label, link.inner.into_iter());

    let title = if link.title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, html_escape(&link.title))
    };
    let href = html_escape(&link.href);

    if is_button {
        format!(
            r#"<a class="cta-button" href="{}"{} rel="nofollow sponsored noopener noreferrer" target="_blank">{}</a>"#,
            href, title, label
        )
    } else if is_external(&link.href) {
        format!(
            r#"<a href="{}"{} rel="noopener noreferrer" target="_blank">{}</a>"#,
            href, title, label
        )
    } else {
        format!(r#"<a href="{}"{}>{}</a>"#, href, title, label)
    }
}
