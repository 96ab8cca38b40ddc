//! Batched multi-row upserts.
//!
//! Every statement binds its values as parameters; rows are never formatted
//! into the SQL text.

use super::models::{Album, Artist, Playlist, PlaylistTrack, Track};
use super::schema::{
    ALBUMS_TABLE, ARTISTS_TABLE, PLAYLISTS_TABLE, PLAYLIST_TRACKS_TABLE, TRACKS_TABLE,
};
use crate::sqlite_persistence::Table;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use rusqlite::{Connection, ToSql};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// SQLITE_MAX_VARIABLE_NUMBER of the bundled SQLite.
const MAX_BOUND_PARAMETERS: usize = 32766;

/// What happens when a playlist-track pair is already stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationPolicy {
    /// Keep the stored position.
    #[default]
    Ignore,
    /// Overwrite the stored position.
    Update,
}

/// A row that binds its values in the column order of its table.
pub trait BulkRow {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>);
}

impl BulkRow for Playlist {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.extend([
            &self.pid as &dyn ToSql,
            &self.name,
            &self.collaborative,
            &self.modified_at,
            &self.num_tracks,
            &self.num_albums,
            &self.num_artists,
            &self.num_followers,
            &self.num_edits,
            &self.duration_ms,
        ]);
    }
}

impl BulkRow for Artist {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.extend([&self.uri as &dyn ToSql, &self.name]);
    }
}

impl BulkRow for Album {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.extend([&self.uri as &dyn ToSql, &self.name]);
    }
}

impl BulkRow for Track {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.extend([
            &self.uri as &dyn ToSql,
            &self.artist_uri,
            &self.name,
            &self.album_uri,
            &self.duration_ms,
        ]);
    }
}

impl BulkRow for PlaylistTrack {
    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.extend([&self.pid as &dyn ToSql, &self.track_uri, &self.pos]);
    }
}

enum OnConflict {
    DoNothing,
    Update(&'static [&'static str]),
}

struct BulkInsert {
    table: &'static Table,
    on_conflict: OnConflict,
}

impl BulkInsert {
    fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    fn sql(&self, num_rows: usize) -> String {
        let columns: Vec<&str> = self.table.columns.iter().map(|c| c.name).collect();
        let placeholders = format!("({})", vec!["?"; columns.len()].join(","));

        let mut sql = String::with_capacity(100 + num_rows * (placeholders.len() + 1));
        sql.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ",
            self.table.name,
            columns.join(", ")
        ));
        for i in 0..num_rows {
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(&placeholders);
        }

        let key = self.table.primary_key().join(", ");
        match self.on_conflict {
            OnConflict::DoNothing => {
                sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", key));
            }
            OnConflict::Update(update_columns) => {
                let assignments: Vec<String> = update_columns
                    .iter()
                    .map(|c| format!("{c}=excluded.{c}"))
                    .collect();
                sql.push_str(&format!(
                    " ON CONFLICT({}) DO UPDATE SET {}",
                    key,
                    assignments.join(", ")
                ));
            }
        }
        sql
    }
}

/// Writes deduplicated collections in batches of at most `batch_size` rows.
pub struct BulkWriter {
    batch_size: usize,
    association_policy: AssociationPolicy,
}

impl BulkWriter {
    pub fn new(batch_size: usize, association_policy: AssociationPolicy) -> Self {
        Self {
            batch_size: batch_size.max(1),
            association_policy,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Insert or overwrite every non-key playlist attribute.
    pub fn write_playlists<'r>(
        &self,
        conn: &Connection,
        rows: impl IntoIterator<Item = &'r Playlist>,
    ) -> Result<usize> {
        let insert = BulkInsert {
            table: &PLAYLISTS_TABLE,
            on_conflict: OnConflict::Update(&[
                "name",
                "collaborative",
                "modified_at",
                "num_tracks",
                "num_albums",
                "num_artists",
                "num_followers",
                "num_edits",
                "duration_ms",
            ]),
        };
        self.execute(conn, &insert, rows)
    }

    /// Insert artists whose URI is not stored yet. Stored names are kept.
    pub fn write_artists<'r>(
        &self,
        conn: &Connection,
        rows: impl IntoIterator<Item = &'r Artist>,
    ) -> Result<usize> {
        let insert = BulkInsert {
            table: &ARTISTS_TABLE,
            on_conflict: OnConflict::DoNothing,
        };
        self.execute(conn, &insert, rows)
    }

    pub fn write_albums<'r>(
        &self,
        conn: &Connection,
        rows: impl IntoIterator<Item = &'r Album>,
    ) -> Result<usize> {
        let insert = BulkInsert {
            table: &ALBUMS_TABLE,
            on_conflict: OnConflict::DoNothing,
        };
        self.execute(conn, &insert, rows)
    }

    /// Insert tracks, overwriting name and duration of stored ones.
    pub fn write_tracks<'r>(
        &self,
        conn: &Connection,
        rows: impl IntoIterator<Item = &'r Track>,
    ) -> Result<usize> {
        let insert = BulkInsert {
            table: &TRACKS_TABLE,
            on_conflict: OnConflict::Update(&["track_name", "duration_ms"]),
        };
        self.execute(conn, &insert, rows)
    }

    pub fn write_playlist_tracks<'r>(
        &self,
        conn: &Connection,
        rows: impl IntoIterator<Item = &'r PlaylistTrack>,
    ) -> Result<usize> {
        let on_conflict = match self.association_policy {
            AssociationPolicy::Ignore => OnConflict::DoNothing,
            AssociationPolicy::Update => OnConflict::Update(&["pos"]),
        };
        let insert = BulkInsert {
            table: &PLAYLIST_TRACKS_TABLE,
            on_conflict,
        };
        self.execute(conn, &insert, rows)
    }

    fn rows_per_statement(&self, insert: &BulkInsert) -> usize {
        self.batch_size
            .min(MAX_BOUND_PARAMETERS / insert.column_count())
            .max(1)
    }

    fn execute<'r, T: BulkRow + 'r>(
        &self,
        conn: &Connection,
        insert: &BulkInsert,
        rows: impl IntoIterator<Item = &'r T>,
    ) -> Result<usize> {
        let rows_per_statement = self.rows_per_statement(insert);
        let mut batch: Vec<&T> = Vec::with_capacity(rows_per_statement);
        let mut changed = 0;
        let mut statements = 0;

        for row in rows {
            batch.push(row);
            if batch.len() == rows_per_statement {
                changed += Self::flush(conn, insert, &batch)?;
                statements += 1;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            changed += Self::flush(conn, insert, &batch)?;
            statements += 1;
        }

        debug!(
            "{}: {} rows changed in {} statements",
            insert.table.name, changed, statements
        );
        Ok(changed)
    }

    fn flush<T: BulkRow>(conn: &Connection, insert: &BulkInsert, batch: &[&T]) -> Result<usize> {
        let sql = insert.sql(batch.len());
        let mut stmt = conn
            .prepare_cached(&sql)
            .with_context(|| format!("Failed to prepare bulk insert into {}", insert.table.name))?;

        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(batch.len() * insert.column_count());
        for row in batch {
            row.bind(&mut params);
        }
        if params.len() != batch.len() * insert.column_count() {
            bail!(
                "{} row binds {} values, table has {} columns",
                insert.table.name,
                params.len() / batch.len(),
                insert.column_count()
            );
        }

        let changed = stmt
            .execute(params.as_slice())
            .with_context(|| format!("Bulk insert into {} failed", insert.table.name))?;
        Ok(changed)
    }
}
