//! Content module - front-matter, markdown rendering and the content store

mod document;
mod frontmatter;
mod markdown;
pub mod sanitize;
pub mod source;

pub use document::{is_valid_slug, title_from_slug, Collection, Document, PageMeta};
pub use frontmatter::{FrontMatter, FrontValue};
pub use markdown::MarkdownRenderer;
pub use source::{ContentSource, DirEntry, FetchError, GithubSource};
