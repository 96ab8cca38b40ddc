//! SQLite schema definitions for the playlist database.
//!
//! Entities are keyed by their natural keys: playlists by `pid`, artists,
//! albums and tracks by their Spotify URI, playlist membership by
//! `(pid, track_uri)`.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

// =============================================================================
// Entity Tables
// =============================================================================

/// Playlists table - one row per exported playlist
pub const PLAYLISTS_TABLE: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("pid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("collaborative", &SqlType::Integer, non_null = true),
        sqlite_column!("modified_at", &SqlType::Integer, non_null = true), // unix seconds
        sqlite_column!("num_tracks", &SqlType::Integer, non_null = true),
        sqlite_column!("num_albums", &SqlType::Integer, non_null = true),
        sqlite_column!("num_artists", &SqlType::Integer, non_null = true),
        sqlite_column!("num_followers", &SqlType::Integer, non_null = true),
        sqlite_column!("num_edits", &SqlType::Integer, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_uri", &SqlType::Text, is_primary_key = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

pub const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("album_uri", &SqlType::Text, is_primary_key = true),
        sqlite_column!("album_name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const TRACK_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_uri",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "album_uri",
    on_delete: ForeignKeyOnChange::Cascade,
};

pub const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("track_uri", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "artist_uri",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_ARTIST_FK)
        ),
        sqlite_column!("track_name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "album_uri",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_ALBUM_FK)
        ),
        sqlite_column!("duration_ms", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_tracks_artist", "artist_uri"),
        ("idx_tracks_album", "album_uri"),
    ],
};

// =============================================================================
// Junction Tables
// =============================================================================

const MEMBERSHIP_PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "pid",
    on_delete: ForeignKeyOnChange::Cascade,
};

const MEMBERSHIP_TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "track_uri",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Playlist <-> Track membership with position
pub const PLAYLIST_TRACKS_TABLE: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sqlite_column!(
            "pid",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            foreign_key = Some(&MEMBERSHIP_PLAYLIST_FK)
        ),
        sqlite_column!(
            "track_uri",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            foreign_key = Some(&MEMBERSHIP_TRACK_FK)
        ),
        sqlite_column!("pos", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_playlist_tracks_track", "track_uri")],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

/// Tables are listed in dependency order, parents first.
pub const PLAYLIST_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        PLAYLISTS_TABLE,
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        PLAYLIST_TRACKS_TABLE,
    ],
}];
