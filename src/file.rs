//! File objects handed to the rewrite engine.
//!
//! A [`DocumentFile`] carries the three things the engine needs to know
//! about the document being processed: its own path, the project base it
//! is resolved against, and its raw textual content. It owns no parsed
//! tree; callers parse, rewrite and re-serialize explicitly, or use the
//! [`DocumentFile::rewrite`] convenience that does all three.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::RewriteConfig;
use crate::dom::{parse, stringify, Document, ParseOptions, RenderOptions};
use crate::error::RewriteError;
use crate::rewrite::rewrite_document;
use crate::stats::StatCache;

/// One document being processed by the build.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
    base: PathBuf,
    contents: String,
}

impl DocumentFile {
    /// Wrap already-loaded content.
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents,
        }
    }

    /// Read a document from disk.
    pub fn read(path: &Path, base: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::new(path, base, contents))
    }

    /// Path of the document itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project base the document's references resolve against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Raw textual content.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Document path as a `/`-separated URL coordinate.
    pub fn url_path(&self) -> String {
        path_to_url(&self.path)
    }

    /// Project base as a `/`-separated URL coordinate.
    pub fn url_base(&self) -> String {
        path_to_url(&self.base)
    }

    /// Parse the document's content into a tree.
    pub fn parse(&self, options: &ParseOptions) -> Result<Document, RewriteError> {
        Ok(parse(&self.contents, options)?)
    }

    /// Parse, rewrite and re-serialize this document in one step.
    pub fn rewrite(
        &self,
        config: &RewriteConfig,
        cache: &StatCache,
        parse_options: &ParseOptions,
        render_options: &RenderOptions,
    ) -> Result<String, RewriteError> {
        let mut doc = self.parse(parse_options)?;
        rewrite_document(&mut doc, self, config, cache)?;
        Ok(stringify(&doc, render_options))
    }
}

fn path_to_url(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
