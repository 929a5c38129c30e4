//! Configuration resolver for the rewrite engine.
//!
//! Caller-supplied [`RewriteOptions`] are merged over built-in defaults to
//! produce one immutable [`RewriteConfig`] per run. Malformed options are
//! rejected here, before any document is touched. A data-only subset can
//! also be loaded from a JSON file discovered next to the project root;
//! when the file is missing or fails to parse we fall back to defaults so
//! build scripts keep working with sensible assumptions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::dom::Node;
use crate::error::{ConfigError, RewriteError};
use crate::file::DocumentFile;
use crate::rewrite::RewriteContext;

const DEFAULT_CONFIG_FILE: &str = "rewrite.config.json";

/// Default stat cache TTL in milliseconds.
pub const DEFAULT_STAT_CACHE_TIME_MS: u64 = 5000;

/// Attribute marker that excludes a node from rewriting.
pub const PRESERVE_ATTRIBUTE: &str = "data-href";

/// Marker value that excludes a node from rewriting.
pub const PRESERVE_VALUE: &str = "preserve";

/// Override for candidate discovery: maps a node to the attribute names
/// that should be rewritten on it, or `None` for "no candidates".
pub type MatchFn = Box<dyn Fn(&Node) -> Option<Vec<String>> + Send + Sync>;

/// Predicate deciding whether a raw URL on a given node may be rewritten.
pub type ValidUrlFn = Box<dyn Fn(&str, &Node) -> bool + Send + Sync>;

/// Hook invoked with the rebuilt URL right before it is written back.
pub type TransformUrlFn = Box<
    dyn Fn(&str, &DocumentFile, &RewriteContext<'_>) -> Result<String, RewriteError> + Send + Sync,
>;

/// Ordered element name to attribute list mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AttrMap(BTreeMap<String, Vec<String>>);

impl AttrMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attribute list for an element.
    pub fn insert(&mut self, element: &str, attributes: &[&str]) {
        self.0.insert(
            element.to_string(),
            attributes.iter().map(|attr| attr.to_string()).collect(),
        );
    }

    /// Attribute list registered for an element, empty when unknown.
    pub fn get(&self, element: &str) -> &[String] {
        self.0.get(element).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the element maps to the given attribute.
    pub fn contains(&self, element: &str, attribute: &str) -> bool {
        self.get(element).iter().any(|attr| attr == attribute)
    }

    /// Merge an addon map over this one. Addon entries replace the
    /// element's attribute list, untouched elements keep theirs.
    pub fn merge(&mut self, addon: AttrMap) {
        for (element, attributes) in addon.0 {
            self.0.insert(element, attributes);
        }
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self, map: &'static str) -> Result<(), ConfigError> {
        for (element, attributes) in &self.0 {
            if element.is_empty() {
                return Err(ConfigError::MalformedMapEntry {
                    map,
                    element: element.clone(),
                    reason: "element name is empty",
                });
            }
            if attributes.is_empty() {
                return Err(ConfigError::MalformedMapEntry {
                    map,
                    element: element.clone(),
                    reason: "attribute list is empty",
                });
            }
            if attributes.iter().any(String::is_empty) {
                return Err(ConfigError::MalformedMapEntry {
                    map,
                    element: element.clone(),
                    reason: "attribute name is empty",
                });
            }
        }
        Ok(())
    }
}

/// Elements whose attributes hold navigable URLs.
pub fn default_rewrite_map() -> AttrMap {
    let mut map = AttrMap::new();
    map.insert("a", &["href"]);
    map.insert("iframe", &["src"]);
    map.insert("form", &["action"]);
    map.insert("area", &["href"]);
    map
}

/// Elements whose attributes point at static assets eligible for
/// cache-busting.
pub fn default_static_map() -> AttrMap {
    let mut map = AttrMap::new();
    map.insert("img", &["src"]);
    map.insert("script", &["src"]);
    map.insert("link", &["href"]);
    map.insert("video", &["src"]);
    map.insert("audio", &["src"]);
    map.insert("source", &["src"]);
    map.insert("embed", &["src"]);
    map.insert("object", &["data"]);
    map
}

fn external_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^[a-z]+:").expect("invalid scheme regex"))
}

/// Default URL predicate: rejects external absolute URLs, protocol-relative
/// URLs, and any URL on a node marked `data-href="preserve"`.
pub fn default_valid_url(url: &str, node: &Node) -> bool {
    if node.attr(PRESERVE_ATTRIBUTE) == Some(PRESERVE_VALUE) {
        return false;
    }
    !(external_url_pattern().is_match(url) || url.starts_with("//"))
}

/// Caller-supplied options merged over defaults by
/// [`RewriteConfig::resolve`].
#[derive(Default)]
pub struct RewriteOptions {
    /// Prefix added to every rewritten URL.
    pub prefix: String,
    /// Entries merged over the default rewrite map.
    pub rewrite_map_addon: Option<AttrMap>,
    /// Entries merged over the default static map.
    pub static_map_addon: Option<AttrMap>,
    /// Stat cache TTL in milliseconds; defaults to 5000.
    pub stat_cache_time: Option<u64>,
    /// Candidate discovery override.
    pub match_fn: Option<MatchFn>,
    /// URL predicate override.
    pub valid_url: Option<ValidUrlFn>,
    /// URL transform hook.
    pub transform_url: Option<TransformUrlFn>,
}

/// Resolved, immutable configuration for one rewrite run.
pub struct RewriteConfig {
    /// Prefix added to every rewritten URL; empty means none.
    pub prefix: String,
    /// Element to navigable-URL-attribute mapping.
    pub rewrite_map: AttrMap,
    /// Element to static-asset-attribute mapping.
    pub static_map: AttrMap,
    /// TTL for stat cache entries.
    pub stat_cache_time: Duration,
    /// Candidate discovery override; the built-in map union applies when
    /// absent.
    pub match_fn: Option<MatchFn>,
    /// URL predicate.
    pub valid_url: ValidUrlFn,
    /// URL transform hook.
    pub transform_url: Option<TransformUrlFn>,
}

impl std::fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("prefix", &self.prefix)
            .field("rewrite_map", &self.rewrite_map)
            .field("static_map", &self.static_map)
            .field("stat_cache_time", &self.stat_cache_time)
            .field("match_fn", &self.match_fn.as_ref().map(|_| "<fn>"))
            .field("valid_url", &"<fn>")
            .field("transform_url", &self.transform_url.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl RewriteConfig {
    /// Merge options over defaults, validating fail-fast.
    pub fn resolve(options: RewriteOptions) -> Result<Self, ConfigError> {
        if external_url_pattern().is_match(&options.prefix) || options.prefix.starts_with("//") {
            return Err(ConfigError::PrefixNotPath {
                prefix: options.prefix,
            });
        }

        let mut rewrite_map = default_rewrite_map();
        if let Some(addon) = options.rewrite_map_addon {
            addon.validate("rewriteMap")?;
            rewrite_map.merge(addon);
        }

        let mut static_map = default_static_map();
        if let Some(addon) = options.static_map_addon {
            addon.validate("staticMap")?;
            static_map.merge(addon);
        }

        Ok(Self {
            prefix: options.prefix,
            rewrite_map,
            static_map,
            stat_cache_time: Duration::from_millis(
                options.stat_cache_time.unwrap_or(DEFAULT_STAT_CACHE_TIME_MS),
            ),
            match_fn: options.match_fn,
            valid_url: options
                .valid_url
                .unwrap_or_else(|| Box::new(default_valid_url)),
            transform_url: options.transform_url,
        })
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self::resolve(RewriteOptions::default()).expect("default options are valid")
    }
}

/// Data-only configuration loadable from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    /// Prefix added to every rewritten URL.
    pub prefix: String,
    /// Entries merged over the default rewrite map.
    pub rewrite_map_addon: AttrMap,
    /// Entries merged over the default static map.
    pub static_map_addon: AttrMap,
    /// Stat cache TTL in milliseconds.
    pub stat_cache_time: u64,
    /// Render documents in XHTML mode.
    pub xhtml: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            rewrite_map_addon: AttrMap::new(),
            static_map_addon: AttrMap::new(),
            stat_cache_time: DEFAULT_STAT_CACHE_TIME_MS,
            xhtml: true,
        }
    }
}

impl FileConfig {
    /// Attempt to load configuration from the provided directory, falling
    /// back to defaults when the file is missing or fails to parse.
    pub fn discover(dir: &Path) -> Self {
        Self::from_path(&dir.join(DEFAULT_CONFIG_FILE)).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Convert the file configuration into resolver options.
    pub fn into_options(self) -> RewriteOptions {
        RewriteOptions {
            prefix: self.prefix,
            rewrite_map_addon: (!self.rewrite_map_addon.is_empty())
                .then_some(self.rewrite_map_addon),
            static_map_addon: (!self.static_map_addon.is_empty()).then_some(self.static_map_addon),
            stat_cache_time: Some(self.stat_cache_time),
            ..Default::default()
        }
    }
}
