//! Front-matter parsing
//!
//! Documents start with a `---` line, a block of `key: value` lines and a
//! closing `---` line. Values are plain scalars or bracketed lists:
//!
//! ```text
//! ---
//! title: "Widget X"
//! categories: [a, b]
//! ---
//! Hello **world**
//! ```
//!
//! Parsing is permissive: malformed lines are skipped, duplicate keys
//! overwrite earlier ones and a missing closing marker means "no front-matter".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const MARKER: &str = "---";

/// A single front-matter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontValue {
    /// The scalar value, if this is not a list
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontValue::Scalar(s) => Some(s),
            FrontValue::List(_) => None,
        }
    }
}

impl From<&str> for FrontValue {
    fn from(value: &str) -> Self {
        FrontValue::Scalar(value.to_string())
    }
}

impl From<Vec<&str>> for FrontValue {
    fn from(items: Vec<&str>) -> Self {
        FrontValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Front-matter fields of a document, in the order they first appeared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, FrontValue>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> (Self, &str) {
        let text = content.strip_prefix('\u{feff}').unwrap_or(content);

        let Some(rest) = strip_opening_marker(text) else {
            return (Self::default(), content);
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if is_marker(line) {
                let block = &rest[..offset];
                let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
                return (Self::parse_block(block), body);
            }
            offset += line.len();
        }

        tracing::debug!("front-matter has no closing marker, treating as body");
        (Self::default(), content)
    }

    fn parse_block(block: &str) -> Self {
        let mut fm = Self::default();

        for line in block.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };

            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            fm.insert(key, parse_value(value));
        }

        fm
    }

    pub fn get(&self, key: &str) -> Option<&FrontValue> {
        self.fields.get(key)
    }

    /// Scalar value of a field; lists yield `None`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FrontValue::as_str)
    }

    /// Insert or overwrite a field, keeping its original position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FrontValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrontValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize back into a `---` delimited block that parses to the same fields
    pub fn to_block(&self) -> String {
        let mut out = String::from(MARKER);
        out.push('\n');

        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            match value {
                FrontValue::Scalar(s) => out.push_str(&quote_scalar(s)),
                FrontValue::List(items) => {
                    let items: Vec<String> = items.iter().map(|i| quote_item(i)).collect();
                    out.push('[');
                    out.push_str(&items.join(", "));
                    out.push(']');
                }
            }
            out.push('\n');
        }

        out.push_str(MARKER);
        out.push('\n');
        out
    }
}

fn strip_opening_marker(text: &str) -> Option<&str> {
    let (first, rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };
    (first.trim_end_matches('\r') == MARKER).then_some(rest)
}

fn is_marker(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == MARKER
}

fn parse_value(raw: &str) -> FrontValue {
    let value = raw.trim();

    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let items = value[1..value.len() - 1]
            .split(',')
            .map(|item| unquote(item.trim()))
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        return FrontValue::List(items);
    }

    FrontValue::Scalar(unquote(value).to_string())
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn quote_scalar(value: &str) -> String {
    let bracketed = value.starts_with('[') && value.ends_with(']');
    if value.is_empty() || bracketed || needs_quotes(value) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn quote_item(value: &str) -> String {
    if needs_quotes(value) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn needs_quotes(value: &str) -> bool {
    value.trim() != value || unquote(value) != value
}
