//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while parsing markup into a document tree.
///
/// A parse failure aborts processing of the affected document only;
/// batch callers move on to the next file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A construct opened but never closed before end of input.
    #[error("unterminated {construct} at byte {position}")]
    Unterminated {
        /// Human readable name of the construct (tag, comment, ...).
        construct: &'static str,
        /// Byte position of the opening marker in the source.
        position: usize,
    },

    /// An attribute value opened with a quote that never closes.
    #[error("unterminated value for attribute `{name}` in tag at byte {position}")]
    Attribute {
        /// Attribute name as written in the tag.
        name: String,
        /// Byte position of the owning tag in the source.
        position: usize,
    },
}

impl ParseError {
    pub(crate) fn unterminated(construct: &'static str, position: usize) -> Self {
        Self::Unterminated {
            construct,
            position,
        }
    }
}

/// Failure while statting or reading a static asset.
///
/// Stat errors are recoverable: they are captured inside the stat entry
/// and surface only if a content hash is actually requested. The type is
/// `Clone` so a memoized failure can be handed out repeatedly.
#[derive(Debug, Clone, Error)]
pub enum StatError {
    /// The filesystem stat itself failed (missing file, permissions).
    #[error("failed to stat {}: {message}", path.display())]
    Stat {
        /// Path that was statted.
        path: PathBuf,
        /// Stringified I/O error.
        message: String,
    },

    /// The path exists but is not a regular file.
    #[error("{} is not a regular file", path.display())]
    NotFile {
        /// Path that was statted.
        path: PathBuf,
    },

    /// Reading the file content for hashing failed.
    #[error("failed to read {}: {message}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Stringified I/O error.
        message: String,
    },
}

/// Malformed caller configuration, reported before any document is
/// processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured prefix is not a plain path.
    #[error("prefix `{prefix}` must be a path, not an absolute or protocol-relative URL")]
    PrefixNotPath {
        /// The rejected prefix.
        prefix: String,
    },

    /// An addon map entry has an empty element or attribute name.
    #[error("{map} addon entry for `{element}` is malformed: {reason}")]
    MalformedMapEntry {
        /// Which map the entry belongs to (`rewriteMap` / `staticMap`).
        map: &'static str,
        /// The offending element name.
        element: String,
        /// What is wrong with the entry.
        reason: &'static str,
    },
}

/// Top-level error for one rewrite operation.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The document's markup could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A transform hook required asset stats that could not be obtained.
    #[error(transparent)]
    Stat(#[from] StatError),

    /// The caller configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
