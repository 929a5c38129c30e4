//! Command-line front end for rewriting documents on disk.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use html_url_rewrite::config::{FileConfig, RewriteConfig};
use html_url_rewrite::dom::{ParseOptions, RenderMode, RenderOptions};
use html_url_rewrite::error::RewriteError;
use html_url_rewrite::file::DocumentFile;
use html_url_rewrite::rewrite::RewriteContext;
use html_url_rewrite::stats::StatCache;

#[derive(Parser)]
#[command(name = "html_url_rewrite")]
#[command(about = "Rewrite URL references in HTML/XML documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Documents to rewrite
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Project root that references resolve against (defaults to the
    /// current directory)
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Directory to write rewritten documents into, mirroring their
    /// location under the base (defaults to rewriting in place)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Prefix added to every rewritten URL
    #[arg(short, long)]
    prefix: Option<String>,

    /// JSON configuration file (default: rewrite.config.json in the base)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append a content-hash token (`?v=<hash>`) to static asset URLs
    #[arg(long)]
    cache_bust: bool,

    /// Stat cache TTL in milliseconds
    #[arg(long)]
    stat_cache_ttl: Option<u64>,

    /// Render HTML output (void elements unclosed) instead of XHTML
    #[arg(long)]
    html: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let base = match &cli.base {
        Some(base) => base.clone(),
        None => env::current_dir().context("failed to determine current directory")?,
    };
    let base = base
        .canonicalize()
        .with_context(|| format!("failed to resolve base directory {}", base.display()))?;

    let mut file_config = match &cli.config {
        Some(path) => FileConfig::from_path(path)
            .ok_or_else(|| anyhow!("failed to load configuration from {}", path.display()))?,
        None => FileConfig::discover(&base),
    };
    if let Some(prefix) = cli.prefix {
        file_config.prefix = prefix;
    }
    if let Some(ttl) = cli.stat_cache_ttl {
        file_config.stat_cache_time = ttl;
    }
    let xhtml = file_config.xhtml && !cli.html;

    let mut options = file_config.into_options();
    if cli.cache_bust {
        options.transform_url = Some(Box::new(cache_bust_transform));
    }
    let config = RewriteConfig::resolve(options).context("invalid configuration")?;

    let cache = StatCache::new();
    let parse_options = ParseOptions {
        xhtml,
        ..Default::default()
    };
    let render_options = RenderOptions {
        mode: if xhtml {
            RenderMode::Xhtml
        } else {
            RenderMode::Html
        },
    };

    for input in &cli.inputs {
        let input = input
            .canonicalize()
            .with_context(|| format!("failed to resolve input {}", input.display()))?;
        let file = DocumentFile::read(&input, &base)
            .with_context(|| format!("failed to read {}", input.display()))?;
        let output = file
            .rewrite(&config, &cache, &parse_options, &render_options)
            .with_context(|| format!("failed to rewrite {}", input.display()))?;

        let target = output_path(&input, &base, cli.out_dir.as_deref());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target, output)
            .with_context(|| format!("failed to write {}", target.display()))?;
        log::info!("rewrote {} -> {}", input.display(), target.display());
    }

    Ok(())
}

/// Mirror an input's location under the base into the output directory,
/// or rewrite in place when no output directory was given.
fn output_path(input: &Path, base: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        None => input.to_path_buf(),
        Some(out_dir) => {
            let relative = input
                .strip_prefix(base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| {
                    PathBuf::from(input.file_name().expect("inputs are files"))
                });
            out_dir.join(relative)
        }
    }
}

/// Built-in transform appending `?v=<content hash>` to static asset URLs.
///
/// Assets whose stats could not be captured keep their URL unchanged; the
/// failure is logged rather than aborting the document.
fn cache_bust_transform(
    url: &str,
    _file: &DocumentFile,
    ctx: &RewriteContext<'_>,
) -> Result<String, RewriteError> {
    if !ctx.is_static {
        return Ok(url.to_string());
    }
    let Some(entry) = ctx.stats.as_ref() else {
        return Ok(url.to_string());
    };

    match entry.hash() {
        Ok(hash) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            Ok(format!("{url}{separator}v={hash:016x}"))
        }
        Err(err) => {
            log::warn!("not cache-busting {url}: {err}");
            Ok(url.to_string())
        }
    }
}
