use crate::playlist_export::{parse_file, ParseError, ParsedFile};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Regular files directly under `dir` whose name ends in `.{extension}`, sorted
/// by path. The suffix alone is enough, so a file named just `.json` is listed.
pub fn list_source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{extension}");
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list data directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry of {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&suffix));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    debug!("Found {} .{} files in {}", files.len(), extension, dir.display());
    Ok(files)
}

fn create_progress_bar(len: u64, enabled: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if !enabled {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({per_sec}, ETA: {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Parse `files` on a pool of `workers` threads.
///
/// Results come back in the order of `files`. The first file that fails to
/// parse fails the whole call.
pub fn parse_all(
    files: &[PathBuf],
    workers: usize,
    show_progress: bool,
) -> Result<Vec<(PathBuf, ParsedFile)>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|idx| format!("playlist-parse-{idx}"))
        .build()
        .context("Failed to build parse thread pool")?;

    info!("Parsing {} files on {} workers", files.len(), workers);
    let progress = create_progress_bar(files.len() as u64, show_progress);

    let parsed = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let result = parse_file(path).map(|parsed| (path.clone(), parsed));
                progress.inc(1);
                result
            })
            .collect::<Result<Vec<_>, ParseError>>()
    });
    progress.finish_and_clear();

    Ok(parsed?)
}
