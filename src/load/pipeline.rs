use super::aggregate::Aggregate;
use super::parallel::{list_source_files, parse_all};
use crate::config::AppConfig;
use crate::playlist_store::{BulkWriter, SqlitePlaylistStore, TableCounts};
use anyhow::{Context, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    SchemaReady,
    ConstraintsRelaxed,
    Writing,
    ConstraintsRestored,
    Committed,
    Aborted,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Uninitialized => "uninitialized",
            LoadState::SchemaReady => "schema-ready",
            LoadState::ConstraintsRelaxed => "constraints-relaxed",
            LoadState::Writing => "writing",
            LoadState::ConstraintsRestored => "constraints-restored",
            LoadState::Committed => "committed",
            LoadState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub files: usize,
    /// Collection sizes after merging, before the store collapses duplicate URIs.
    pub aggregated: TableCounts,
    /// Rows inserted or updated per table. All zero on a dry run.
    pub written: TableCounts,
    /// Table sizes after commit. `None` on a dry run.
    pub stored: Option<TableCounts>,
    pub elapsed: Duration,
    pub state: LoadState,
    pub dry_run: bool,
}

struct Progress {
    state: LoadState,
}

impl Progress {
    fn advance(&mut self, next: LoadState) {
        info!("Load state: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Run one load over `config.data_dir`.
///
/// Any failure rolls the write transaction back and leaves foreign keys
/// enforced; the error is returned after the run is marked aborted.
pub fn run(config: &AppConfig) -> Result<LoadReport> {
    let started = Instant::now();
    let mut progress = Progress {
        state: LoadState::Uninitialized,
    };

    match run_stages(config, &mut progress, started) {
        Ok(report) => Ok(report),
        Err(e) => {
            error!("Load failed in state {}: {:#}", progress.state, e);
            progress.advance(LoadState::Aborted);
            Err(e)
        }
    }
}

fn run_stages(config: &AppConfig, progress: &mut Progress, started: Instant) -> Result<LoadReport> {
    let store = if config.dry_run {
        info!("Dry run, the database will not be opened");
        None
    } else {
        let store = SqlitePlaylistStore::new(&config.db_path)
            .with_context(|| format!("Failed to open store {}", config.db_path.display()))?;
        progress.advance(LoadState::SchemaReady);
        Some(store)
    };

    let files = list_source_files(&config.data_dir, &config.extension)?;
    info!(
        "Loading {} files from {}",
        files.len(),
        config.data_dir.display()
    );

    let aggregate: Aggregate = parse_all(&files, config.workers, config.progress)?
        .into_iter()
        .map(|(path, parsed)| {
            debug!(
                "{}: {} playlists, {} tracks",
                path.display(),
                parsed.playlists.len(),
                parsed.tracks.len()
            );
            parsed
        })
        .collect();
    let aggregated = aggregate.counts();
    info!(
        "Aggregated {} playlists, {} artists, {} albums, {} tracks, {} playlist tracks",
        aggregated.playlists,
        aggregated.artists,
        aggregated.albums,
        aggregated.tracks,
        aggregated.playlist_tracks
    );

    let Some(store) = store else {
        return Ok(LoadReport {
            files: files.len(),
            aggregated,
            written: TableCounts::default(),
            stored: None,
            elapsed: started.elapsed(),
            state: progress.state,
            dry_run: true,
        });
    };

    let written = write_aggregate(&store, config, &aggregate, progress)?;
    progress.advance(LoadState::Committed);

    let stored = store.get_counts()?;
    info!(
        "Database contains {} playlists, {} artists, {} albums, {} tracks, {} playlist tracks",
        stored.playlists, stored.artists, stored.albums, stored.tracks, stored.playlist_tracks
    );

    Ok(LoadReport {
        files: files.len(),
        aggregated,
        written,
        stored: Some(stored),
        elapsed: started.elapsed(),
        state: progress.state,
        dry_run: false,
    })
}

fn write_aggregate(
    store: &SqlitePlaylistStore,
    config: &AppConfig,
    aggregate: &Aggregate,
    progress: &mut Progress,
) -> Result<TableCounts> {
    let writer = BulkWriter::new(config.batch_size, config.association_policy);

    let mut window = store.begin_load()?;
    progress.advance(LoadState::ConstraintsRelaxed);

    progress.advance(LoadState::Writing);
    let conn = window.connection();
    let written = TableCounts {
        playlists: writer
            .write_playlists(conn, &aggregate.playlists)
            .context("Failed to write playlists")?,
        artists: writer
            .write_artists(conn, &aggregate.artists)
            .context("Failed to write artists")?,
        albums: writer
            .write_albums(conn, &aggregate.albums)
            .context("Failed to write albums")?,
        tracks: writer
            .write_tracks(conn, &aggregate.tracks)
            .context("Failed to write tracks")?,
        playlist_tracks: writer
            .write_playlist_tracks(conn, &aggregate.playlist_tracks)
            .context("Failed to write playlist tracks")?,
    };

    window.restore_constraints()?;
    progress.advance(LoadState::ConstraintsRestored);

    window.commit().context("Failed to commit load")?;
    Ok(written)
}
