//! Row models for the playlist database.
//!
//! Each struct maps one-to-one to a table row. Artist, album and track rows
//! are ordered over every field, URI first: they are deduplicated as whole
//! tuples and written in that order.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    pub pid: i64,
    pub name: String,
    pub collaborative: bool,
    pub modified_at: i64,
    pub num_tracks: i64,
    pub num_albums: i64,
    pub num_artists: i64,
    pub num_followers: i64,
    pub num_edits: i64,
    pub duration_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Artist {
    pub uri: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Album {
    pub uri: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Track {
    pub uri: String,
    pub artist_uri: String,
    pub name: String,
    pub album_uri: String,
    pub duration_ms: i64,
}

/// Ordered membership of a track in a playlist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistTrack {
    pub pid: i64,
    pub track_uri: String,
    pub pos: i64,
}

/// Row counts of the five tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub playlists: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub playlist_tracks: usize,
}
