//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters left unescaped in a query value
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/reviews/widget-x") // -> "https://example.com/reviews/widget-x"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

/// Link to the search page for a term
pub fn search_url(term: &str) -> String {
    format!("/search?q={}", encode_query_value(term))
}

/// Percent-encode a query string value
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        SiteConfig {
            url: "https://example.com/".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/reviews/widget-x"),
            "https://example.com/reviews/widget-x"
        );
        assert_eq!(full_url_for(&config, "/"), "https://example.com/");
    }

    #[test]
    fn test_search_url() {
        assert_eq!(search_url("noise cancelling"), "/search?q=noise%20cancelling");
        assert_eq!(search_url("a&b"), "/search?q=a%26b");
    }
}
