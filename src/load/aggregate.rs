//! Global collections merged from every parsed file.
//!
//! Artists, albums and tracks are sets over the whole record, so two records
//! sharing a URI but differing in name both survive until the store collapses
//! them. The sets are ordered, so the same input always reaches the store in
//! the same order and picks the same survivor.

use crate::playlist_export::ParsedFile;
use crate::playlist_store::{Album, Artist, Playlist, PlaylistTrack, TableCounts, Track};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct Aggregate {
    pub playlists: Vec<Playlist>,
    pub artists: BTreeSet<Artist>,
    pub albums: BTreeSet<Album>,
    pub tracks: BTreeSet<Track>,
    pub playlist_tracks: Vec<PlaylistTrack>,
}

impl Aggregate {
    pub fn merge(&mut self, file: ParsedFile) {
        self.playlists.extend(file.playlists);
        self.artists.extend(file.artists);
        self.albums.extend(file.albums);
        self.tracks.extend(file.tracks);
        self.playlist_tracks.extend(file.playlist_tracks);
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            playlists: self.playlists.len(),
            artists: self.artists.len(),
            albums: self.albums.len(),
            tracks: self.tracks.len(),
            playlist_tracks: self.playlist_tracks.len(),
        }
    }
}

impl FromIterator<ParsedFile> for Aggregate {
    fn from_iter<I: IntoIterator<Item = ParsedFile>>(iter: I) -> Self {
        let mut aggregate = Aggregate::default();
        for file in iter {
            aggregate.merge(file);
        }
        aggregate
    }
}
