//! URL rewriting over parsed document trees.
//!
//! The responsibilities are split into focused submodules so candidate
//! discovery, token extraction and URL resolution can be tested
//! independently of the orchestrating walk.

mod engine;
mod extract;
mod matcher;
mod resolve;

pub use engine::{rewrite_document, RewriteContext};
pub use extract::{extract_urls, UrlToken};
pub use matcher::candidates;
pub use resolve::{absolute_url, rebuild_url};
