//! Candidate discovery: which attributes of a node get rewritten.

use crate::config::RewriteConfig;
use crate::dom::Node;

/// Attribute names on `node` that are rewrite candidates, in first-seen
/// order with duplicates removed.
///
/// The default rule takes the union of the rewrite and static maps for
/// the element name. A configured `match` override replaces that rule,
/// but two invariants apply on top of either result: a node carrying a
/// non-empty `style` attribute always has `style` as a candidate, and an
/// attribute is only a candidate when its value is present and non-empty.
pub fn candidates(node: &Node, config: &RewriteConfig) -> Vec<String> {
    if !node.is_element() {
        return Vec::new();
    }

    let mut attrs = match &config.match_fn {
        Some(matcher) => matcher(node).unwrap_or_default(),
        None => {
            let mut union: Vec<String> = Vec::new();
            for attr in config
                .rewrite_map
                .get(node.name())
                .iter()
                .chain(config.static_map.get(node.name()))
            {
                if !union.contains(attr) {
                    union.push(attr.clone());
                }
            }
            union
        }
    };

    if !attrs.iter().any(|attr| attr == "style")
        && node.attr("style").is_some_and(|value| !value.is_empty())
    {
        attrs.push("style".to_string());
    }

    attrs.retain(|attr| node.attr(attr).is_some_and(|value| !value.is_empty()));
    attrs
}
