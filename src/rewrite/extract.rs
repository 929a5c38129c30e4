//! URL token extraction from attribute values.

use std::sync::OnceLock;

use regex::Regex;

/// A raw URL substring and its byte offset inside the owning attribute
/// value. Produced and consumed within a single attribute rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlToken {
    /// The raw URL text.
    pub url: String,
    /// Byte offset of the URL inside the attribute value.
    pub offset: usize,
}

fn style_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\b(url\(['"]?)(.+?)['"]?\)"#).expect("invalid url() regex")
    })
}

/// Extract the URL tokens carried by an attribute value, in source order.
///
/// `style` is the one attribute that may reference several resources, as
/// `url(...)` tokens; every other tracked attribute is single-URL by
/// construction and yields its whole value at offset 0. The reported
/// offset is where the URL text itself begins (after the opening quote or
/// paren), so replacements splice over exactly the URL bytes.
pub fn extract_urls(attribute: &str, value: &str) -> Vec<UrlToken> {
    if attribute == "style" {
        style_url_pattern()
            .captures_iter(value)
            .filter_map(|caps| caps.get(2))
            .map(|url| UrlToken {
                url: url.as_str().to_string(),
                offset: url.start(),
            })
            .collect()
    } else {
        vec![UrlToken {
            url: value.to_string(),
            offset: 0,
        }]
    }
}
