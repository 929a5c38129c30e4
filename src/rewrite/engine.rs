//! The rewrite engine: walks a document tree and rewrites URL references.

use std::sync::Arc;

use crate::config::RewriteConfig;
use crate::dom::{Document, Node, NodeId};
use crate::error::RewriteError;
use crate::file::DocumentFile;
use crate::rewrite::extract::extract_urls;
use crate::rewrite::matcher::candidates;
use crate::rewrite::resolve::{absolute_url, rebuild_url};
use crate::stats::{StatCache, StatEntry};

/// Context handed to the `transform_url` hook for one token.
pub struct RewriteContext<'a> {
    /// Resolved absolute URL before the prefix was applied.
    pub clean: &'a str,
    /// The active configuration.
    pub config: &'a RewriteConfig,
    /// The node owning the attribute being rewritten.
    pub node: &'a Node,
    /// Whether the token references a static asset.
    pub is_static: bool,
    /// Stats for the referenced asset; present only for static tokens.
    pub stats: Option<Arc<StatEntry>>,
    /// Name of the attribute being rewritten.
    pub attribute: &'a str,
}

/// Rewrite every URL reference in the document, in place.
///
/// The tree is walked depth-first pre-order. For each candidate attribute
/// the extractor's tokens are filtered through the `valid_url` predicate
/// and the survivors are processed in descending offset order, so a
/// replacement never shifts the offsets of tokens still waiting. The
/// reassembled value is stored back in a single assignment per attribute;
/// all other attribute bytes are left untouched.
///
/// Filesystem trouble while statting an asset is not fatal here: the
/// error travels inside the stat entry and only surfaces if the transform
/// hook requests the content hash and propagates the failure.
pub fn rewrite_document(
    doc: &mut Document,
    file: &DocumentFile,
    config: &RewriteConfig,
    cache: &StatCache,
) -> Result<(), RewriteError> {
    let parent_url = file.url_path();
    let root_url = file.url_base();

    let mut pending: Vec<(NodeId, String)> = Vec::new();
    for id in doc.descendants(doc.root()) {
        for attribute in candidates(doc.node(id), config) {
            pending.push((id, attribute));
        }
    }

    let mut rewritten_tokens = 0usize;
    let mut writes: Vec<(NodeId, String, String)> = Vec::new();
    for (id, attribute) in pending {
        let node = doc.node(id);
        let Some(original) = node.attr(&attribute) else {
            continue;
        };

        let tokens: Vec<_> = extract_urls(&attribute, original)
            .into_iter()
            .filter(|token| (config.valid_url)(&token.url, node))
            .collect();
        if tokens.is_empty() {
            continue;
        }

        let is_static =
            attribute == "style" || config.static_map.contains(node.name(), &attribute);

        let mut value = original.to_string();
        for token in tokens.iter().rev() {
            let clean = absolute_url(&token.url, &parent_url, &root_url);
            let mut target = rebuild_url(&clean, &config.prefix);

            if let Some(hook) = &config.transform_url {
                let stats = is_static
                    .then(|| cache.stats_for(&clean, file.base(), config.stat_cache_time));
                let ctx = RewriteContext {
                    clean: &clean,
                    config,
                    node,
                    is_static,
                    stats,
                    attribute: &attribute,
                };
                target = hook(&target, file, &ctx)?;
            }

            value.replace_range(token.offset..token.offset + token.url.len(), &target);
            rewritten_tokens += 1;
        }
        writes.push((id, attribute, value));
    }

    for (id, attribute, value) in writes {
        doc.node_mut(id).set_attr(&attribute, value);
    }

    log::debug!(
        "rewrote {rewritten_tokens} URL token(s) in {}",
        file.path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteOptions;
    use crate::dom::{parse, stringify, ParseOptions, RenderOptions};
    use crate::error::StatError;
    use std::fs;
    use tempfile::tempdir;

    fn rewrite(markup: &str, path: &str, base: &str, options: RewriteOptions) -> String {
        let mut doc = parse(markup, &ParseOptions::default()).unwrap();
        let file = DocumentFile::new(path, base, markup.to_string());
        let config = RewriteConfig::resolve(options).unwrap();
        let cache = StatCache::new();
        rewrite_document(&mut doc, &file, &config, &cache).unwrap();
        stringify(&doc, &RenderOptions::default())
    }

    fn with_prefix(prefix: &str) -> RewriteOptions {
        RewriteOptions {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    #[test]
    fn prefixes_a_root_document_link() {
        let out = rewrite(
            r#"<a href="page.html">go</a>"#,
            "/proj/index.html",
            "/proj",
            with_prefix("/a/b/c"),
        );
        assert_eq!(out, r#"<a href="/a/b/c/page.html">go</a>"#);
    }

    #[test]
    fn resolves_nested_style_references_against_the_root() {
        let out = rewrite(
            r#"<div style="background:url('../img/x.png')">x</div>"#,
            "/proj/sub/dir/page.html",
            "/proj",
            with_prefix("/a/b/c"),
        );
        assert_eq!(
            out,
            r#"<div style="background:url('/a/b/c/sub/img/x.png')">x</div>"#
        );
    }

    #[test]
    fn rewrites_every_style_token_and_nothing_else() {
        let markup = r#"<div style="color:red;background:url(a.png);border-image:url('b.png') 30">x</div>"#;
        let out = rewrite(markup, "/proj/index.html", "/proj", with_prefix("/p"));
        assert_eq!(
            out,
            r#"<div style="color:red;background:url(/p/a.png);border-image:url('/p/b.png') 30">x</div>"#
        );
    }

    #[test]
    fn external_urls_are_never_altered() {
        let markup = concat!(
            r#"<a href="https://example.com/page">x</a>"#,
            r#"<script src="//cdn.example.com/app.js"></script>"#,
            r#"<a href="mailto:user@example.com">m</a>"#,
        );
        let out = rewrite(markup, "/proj/index.html", "/proj", with_prefix("/p"));
        assert_eq!(out, markup);
    }

    #[test]
    fn preserve_marked_nodes_are_never_altered() {
        let markup = r#"<a href="page.html" data-href="preserve">x</a>"#;
        let out = rewrite(markup, "/proj/index.html", "/proj", with_prefix("/p"));
        assert_eq!(out, markup);
    }

    #[test]
    fn untracked_attributes_stay_untouched() {
        let markup = r#"<a href="page.html" title="page.html">x</a>"#;
        let out = rewrite(markup, "/proj/index.html", "/proj", with_prefix("/p"));
        assert_eq!(out, r#"<a href="/p/page.html" title="page.html">x</a>"#);
    }

    #[test]
    fn transform_hook_sees_the_final_url() {
        let out = rewrite(
            r#"<a href="page.html">x</a><img src="pic.png">"#,
            "/proj/index.html",
            "/proj",
            RewriteOptions {
                prefix: "/a/b/c".into(),
                transform_url: Some(Box::new(|url, _file, _ctx| Ok(format!("/-{url}")))),
                ..Default::default()
            },
        );
        assert_eq!(
            out,
            r#"<a href="/-/a/b/c/page.html">x</a><img src="/-/a/b/c/pic.png" />"#
        );
    }

    #[test]
    fn transform_hook_classifies_static_references() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pic.png"), b"bytes").unwrap();
        let base = dir.path().to_string_lossy().to_string();

        let markup = r#"<a href="page.html">x</a><img src="pic.png"><i style="background:url(pic.png)">s</i>"#;
        let mut doc = parse(markup, &ParseOptions::default()).unwrap();
        let file = DocumentFile::new(
            format!("{base}/index.html"),
            base.clone(),
            markup.to_string(),
        );
        let config = RewriteConfig::resolve(RewriteOptions {
            transform_url: Some(Box::new(|url, _file, ctx| {
                if ctx.is_static {
                    let entry = ctx.stats.as_ref().expect("static tokens carry stats");
                    Ok(format!("{url}?v={:016x}", entry.hash()?))
                } else {
                    assert!(ctx.stats.is_none());
                    Ok(url.to_string())
                }
            })),
            ..Default::default()
        })
        .unwrap();
        let cache = StatCache::new();
        rewrite_document(&mut doc, &file, &config, &cache).unwrap();

        let hash = xxhash_rust::xxh3::xxh3_64(b"bytes");
        let out = stringify(&doc, &RenderOptions::default());
        assert_eq!(
            out,
            format!(
                r#"<a href="/page.html">x</a><img src="/pic.png?v={hash:016x}" /><i style="background:url(/pic.png?v={hash:016x})">s</i>"#
            )
        );
        // the anchor and the two static tokens hit one cache entry
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hook_may_propagate_missing_asset_errors() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_string_lossy().to_string();

        let markup = r#"<img src="missing.png">"#;
        let mut doc = parse(markup, &ParseOptions::default()).unwrap();
        let file = DocumentFile::new(
            format!("{base}/index.html"),
            base.clone(),
            markup.to_string(),
        );
        let config = RewriteConfig::resolve(RewriteOptions {
            transform_url: Some(Box::new(|url, _file, ctx| {
                let entry = ctx.stats.as_ref().expect("static tokens carry stats");
                Ok(format!("{url}?v={:016x}", entry.hash()?))
            })),
            ..Default::default()
        })
        .unwrap();
        let cache = StatCache::new();

        let err = rewrite_document(&mut doc, &file, &config, &cache).unwrap_err();
        assert!(matches!(err, RewriteError::Stat(StatError::Stat { .. })));
    }

    #[test]
    fn stat_failures_without_a_hash_request_are_not_fatal() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_string_lossy().to_string();

        let markup = r#"<img src="missing.png">"#;
        let mut doc = parse(markup, &ParseOptions::default()).unwrap();
        let file = DocumentFile::new(
            format!("{base}/index.html"),
            base.clone(),
            markup.to_string(),
        );
        let config = RewriteConfig::resolve(RewriteOptions {
            transform_url: Some(Box::new(|url, _file, ctx| {
                assert!(ctx.stats.as_ref().is_some_and(|entry| !entry.exists()));
                Ok(url.to_string())
            })),
            ..Default::default()
        })
        .unwrap();
        let cache = StatCache::new();

        rewrite_document(&mut doc, &file, &config, &cache).unwrap();
        let out = stringify(&doc, &RenderOptions::default());
        assert_eq!(out, r#"<img src="/missing.png" />"#);
    }

    #[test]
    fn malformed_style_values_are_left_alone() {
        let markup = r#"<div style="background:url garbage(">x</div>"#;
        let out = rewrite(markup, "/proj/index.html", "/proj", with_prefix("/p"));
        assert_eq!(out, markup);
    }

    #[test]
    fn rewrites_a_full_document() {
        let markup = concat!(
            "<!DOCTYPE html>\n",
            "<html>\n<head>\n",
            r#"<link rel="stylesheet" href="css/site.css" />"#,
            "\n",
            r#"<script src="js/app.js"></script>"#,
            "\n</head>\n<body>\n",
            "<!-- navigation -->\n",
            r#"<a href="../index.html">home</a>"#,
            "\n",
            r#"<form action="search.html"><input type="text" /></form>"#,
            "\n",
            r#"<img src="img/logo.png" alt="logo" />"#,
            "\n</body>\n</html>"
        );
        let out = rewrite(markup, "/proj/docs/page.html", "/proj", with_prefix("/a/b/c"));
        let expected = concat!(
            "<!DOCTYPE html>\n",
            "<html>\n<head>\n",
            r#"<link rel="stylesheet" href="/a/b/c/docs/css/site.css" />"#,
            "\n",
            r#"<script src="/a/b/c/docs/js/app.js"></script>"#,
            "\n</head>\n<body>\n",
            "<!-- navigation -->\n",
            r#"<a href="/a/b/c/index.html">home</a>"#,
            "\n",
            r#"<form action="/a/b/c/docs/search.html"><input type="text" /></form>"#,
            "\n",
            r#"<img src="/a/b/c/docs/img/logo.png" alt="logo" />"#,
            "\n</body>\n</html>"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn custom_addon_elements_are_rewritten() {
        let mut addon = crate::config::AttrMap::new();
        addon.insert("foo", &["href"]);
        let out = rewrite(
            r#"<foo href="page.html">x</foo>"#,
            "/proj/index.html",
            "/proj",
            RewriteOptions {
                prefix: "/a/b/c".into(),
                rewrite_map_addon: Some(addon),
                ..Default::default()
            },
        );
        assert_eq!(out, r#"<foo href="/a/b/c/page.html">x</foo>"#);
    }
}
