//! SQLite-backed playlist store.
//!
//! The store owns the single connection of a load run. It initialises the
//! schema on open and hands out [`LoadWindow`]s for bulk writes.

use super::constraints::LoadWindow;
use super::models::TableCounts;
use super::schema::PLAYLIST_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::{VersionedSchema, BASE_DB_VERSION};
use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::info;

pub struct SqlitePlaylistStore {
    conn: Connection,
}

fn latest_schema() -> &'static VersionedSchema {
    &PLAYLIST_VERSIONED_SCHEMAS[PLAYLIST_VERSIONED_SCHEMAS.len() - 1]
}

/// Creates the schema of a fresh database, or checks an existing one.
///
/// Safe to call on every open: tables and indices are created only when
/// missing, and the resulting schema is validated against the definition.
fn initialize_schema(conn: &Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = PLAYLIST_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = latest_schema();

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating playlist db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    // Databases created outside this tool have no version stamp, they only
    // pass if their tables match the latest schema.
    if db_version >= BASE_DB_VERSION as i64 {
        let current_version = (db_version - BASE_DB_VERSION as i64) as usize;
        if current_version > latest_version {
            bail!(
                "Playlist db is at version {}, newer than the latest known version {}",
                current_version,
                latest_version
            );
        }
    }

    latest_schema.create(conn)?;
    latest_schema
        .validate(conn)
        .context("Existing database schema is incompatible")?;
    Ok(())
}

impl SqlitePlaylistStore {
    /// Open (creating if needed) the playlist database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        if let Some(parent) = db_path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            db_path_ref,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open playlist database {}", db_path_ref.display()))?;

        let store = Self::from_connection(conn)?;

        let counts = store.get_counts()?;
        info!(
            "Opened playlist db: {} playlists, {} artists, {} albums, {} tracks",
            counts.playlists, counts.artists, counts.albums, counts.tracks
        );

        Ok(store)
    }

    /// Wrap an already open connection, initialising its schema.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(SqlitePlaylistStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Relax constraints and open the write transaction of a load run.
    pub fn begin_load(&self) -> Result<LoadWindow<'_>> {
        LoadWindow::open(&self.conn, latest_schema().tables)
    }

    pub fn get_counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(TableCounts {
            playlists: count("playlists")?,
            artists: count("artists")?,
            albums: count("albums")?,
            tracks: count("tracks")?,
            playlist_tracks: count("playlist_tracks")?,
        })
    }

    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: i64 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
        Ok(enabled == 1)
    }
}
