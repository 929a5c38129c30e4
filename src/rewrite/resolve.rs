//! URL resolution and prefix rebuilding.
//!
//! URLs here are `/`-separated project coordinates, not OS paths: prefixes
//! and cache tokens must be computed against a stable root-relative
//! coordinate system regardless of how deep the referencing document sits
//! in the project tree.

use std::sync::OnceLock;

use regex::Regex;

/// Resolve a raw (possibly relative) URL to a root-relative absolute path.
///
/// A URL that already starts with `/` is returned unchanged. Anything else
/// is joined against the directory of `parent_url` (the path of the
/// document referencing it), normalized, and stripped of the project
/// `root` prefix with a leading `/` guaranteed.
pub fn absolute_url(url: &str, parent_url: &str, root: &str) -> String {
    if url.starts_with('/') {
        return url.to_string();
    }

    let dir = match parent_url.rfind('/') {
        Some(index) => &parent_url[..index],
        None => "",
    };
    let joined = if dir.is_empty() {
        url.to_string()
    } else {
        format!("{dir}/{url}")
    };

    let mut out = normalize(&joined);
    if let Some(stripped) = out.strip_prefix(root) {
        out = if stripped.starts_with('/') {
            stripped.to_string()
        } else {
            format!("/{stripped}")
        };
    }
    out
}

/// Rebuild a resolved URL with the configured prefix.
///
/// An empty prefix is the identity; otherwise the prefix is joined in
/// front and any run of consecutive slashes produced by the join is
/// collapsed to one.
pub fn rebuild_url(url: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return url.to_string();
    }

    static SLASHES: OnceLock<Regex> = OnceLock::new();
    let slashes = SLASHES.get_or_init(|| Regex::new(r"/{2,}").expect("invalid slash regex"));
    slashes
        .replace_all(&format!("{prefix}/{url}"), "/")
        .into_owned()
}

/// Collapse `.` and `..` segments and duplicate slashes.
///
/// Leading `..` segments that escape the root are kept, matching how
/// filesystem path normalization treats them.
fn normalize(url: &str) -> String {
    let absolute = url.starts_with('/');
    let trailing_slash = url.ends_with('/') && url.len() > 1;

    let mut segments: Vec<&str> = Vec::new();
    for segment in url.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut out = String::new();
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing_slash && !out.ends_with('/') {
        out.push('/');
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_input_passes_through() {
        assert_eq!(
            absolute_url("/img/x.png", "/proj/docs/page.html", "/proj"),
            "/img/x.png"
        );
    }

    #[test]
    fn joins_against_document_directory() {
        assert_eq!(
            absolute_url("img/x.png", "/proj/docs/page.html", "/proj"),
            "/docs/img/x.png"
        );
    }

    #[test]
    fn collapses_parent_segments() {
        assert_eq!(
            absolute_url("../img/x.png", "/proj/sub/dir/page.html", "/proj"),
            "/sub/img/x.png"
        );
        assert_eq!(
            absolute_url("./a/./b.css", "/proj/page.html", "/proj"),
            "/a/b.css"
        );
    }

    #[test]
    fn strips_root_at_document_root() {
        assert_eq!(
            absolute_url("page.html", "/proj/index.html", "/proj"),
            "/page.html"
        );
    }

    #[test]
    fn keeps_paths_outside_root() {
        assert_eq!(
            absolute_url("../shared/x.css", "/proj/index.html", "/proj"),
            "/shared/x.css"
        );
    }

    #[test]
    fn rebuild_is_identity_without_prefix() {
        assert_eq!(rebuild_url("/docs/img/x.png", ""), "/docs/img/x.png");
    }

    #[test]
    fn rebuild_joins_and_collapses_slashes() {
        assert_eq!(rebuild_url("/page.html", "/a/b/c"), "/a/b/c/page.html");
        assert_eq!(rebuild_url("/page.html", "/a/b/c/"), "/a/b/c/page.html");
        assert_eq!(rebuild_url("//x//y.png", "/p//"), "/p/x/y.png");
    }

    #[test]
    fn absolute_then_empty_rebuild_is_idempotent() {
        let abs = absolute_url("img/../img/x.png", "/proj/docs/page.html", "/proj");
        assert_eq!(rebuild_url(&abs, ""), abs);
        assert_eq!(absolute_url(&abs, "/proj/other.html", "/proj"), abs);
    }
}
