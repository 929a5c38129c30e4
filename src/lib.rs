#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod dom;
pub mod error;
pub mod file;
pub mod rewrite;
pub mod stats;

pub use config::{AttrMap, FileConfig, RewriteConfig, RewriteOptions};
pub use error::{ConfigError, ParseError, RewriteError, StatError};
pub use file::DocumentFile;
pub use rewrite::{rewrite_document, RewriteContext};
pub use stats::{StatCache, StatEntry};
