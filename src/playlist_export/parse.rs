use super::document::ExportDocument;
use crate::playlist_store::{Album, Artist, Playlist, PlaylistTrack, Track};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading a playlist export.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed playlist export {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Records decoded from a single export file.
///
/// Artists and albums are listed once per track occurrence, duplicates
/// included; deduplication happens when files are merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub playlists: Vec<Playlist>,
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
    pub playlist_tracks: Vec<PlaylistTrack>,
}

impl From<ExportDocument> for ParsedFile {
    fn from(document: ExportDocument) -> Self {
        let mut parsed = ParsedFile::default();
        for export_playlist in document.playlists {
            for track in export_playlist.tracks {
                parsed.artists.push(Artist {
                    uri: track.artist_uri.clone(),
                    name: track.artist_name,
                });
                parsed.albums.push(Album {
                    uri: track.album_uri.clone(),
                    name: track.album_name,
                });
                parsed.playlist_tracks.push(PlaylistTrack {
                    pid: export_playlist.pid,
                    track_uri: track.track_uri.clone(),
                    pos: track.pos,
                });
                parsed.tracks.push(Track {
                    uri: track.track_uri,
                    artist_uri: track.artist_uri,
                    name: track.track_name,
                    album_uri: track.album_uri,
                    duration_ms: track.duration_ms,
                });
            }
            parsed.playlists.push(Playlist {
                pid: export_playlist.pid,
                name: export_playlist.name,
                collaborative: export_playlist.collaborative,
                modified_at: export_playlist.modified_at,
                num_tracks: export_playlist.num_tracks,
                num_albums: export_playlist.num_albums,
                num_artists: export_playlist.num_artists,
                num_followers: export_playlist.num_followers,
                num_edits: export_playlist.num_edits,
                duration_ms: export_playlist.duration_ms,
            });
        }
        parsed
    }
}

pub fn parse_str(text: &str) -> Result<ParsedFile, serde_json::Error> {
    let document: ExportDocument = serde_json::from_str(text)?;
    Ok(document.into())
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedFile, ParseError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })
}
