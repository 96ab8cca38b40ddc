//! Export corpus fixtures

use pezzottify_playlist_loader::config::AppConfig;
use pezzottify_playlist_loader::playlist_store::{AssociationPolicy, SqlitePlaylistStore};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A track entry as it appears inside an export playlist.
pub fn track(
    pos: i64,
    track_uri: &str,
    track_name: &str,
    artist: (&str, &str),
    album: (&str, &str),
) -> Value {
    json!({
        "pos": pos,
        "artist_name": artist.1,
        "track_uri": track_uri,
        "artist_uri": artist.0,
        "track_name": track_name,
        "album_uri": album.0,
        "duration_ms": 180_000 + pos,
        "album_name": album.1,
    })
}

/// An export playlist; the aggregate counts are derived from `tracks`.
pub fn playlist(pid: i64, name: &str, collaborative: Value, tracks: Vec<Value>) -> Value {
    let duration: i64 = tracks
        .iter()
        .filter_map(|t| t["duration_ms"].as_i64())
        .sum();
    let num_tracks = tracks.len();
    json!({
        "name": name,
        "collaborative": collaborative,
        "pid": pid,
        "modified_at": 1_500_000_000 + pid,
        "num_tracks": num_tracks,
        "num_albums": 1,
        "num_followers": 1,
        "tracks": tracks,
        "num_edits": 2,
        "duration_ms": duration,
        "num_artists": 1,
    })
}

/// Temporary input directory plus the database path the loader writes to.
pub struct TestCorpus {
    data_dir: TempDir,
    db_dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().expect("create data dir"),
            db_dir: TempDir::new().expect("create db dir"),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.path().to_path_buf()
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.path().join("spotify_data.db")
    }

    /// Write an export file named `file_name` holding `playlists`.
    pub fn write_slice(&self, file_name: &str, playlists: Vec<Value>) {
        let document = json!({
            "info": {"generated_on": "2017-12-03 08:41:42.057563", "slice": file_name},
            "playlists": playlists,
        });
        fs::write(
            self.data_dir.path().join(file_name),
            serde_json::to_string_pretty(&document).expect("serialize slice"),
        )
        .expect("write slice");
    }

    pub fn write_raw(&self, file_name: &str, content: &str) {
        fs::write(self.data_dir.path().join(file_name), content).expect("write file");
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            data_dir: self.data_dir(),
            db_path: self.db_path(),
            extension: "json".to_string(),
            workers: 3,
            batch_size: 2,
            association_policy: AssociationPolicy::Ignore,
            progress: false,
            dry_run: false,
        }
    }

    pub fn open_store(&self) -> SqlitePlaylistStore {
        SqlitePlaylistStore::new(self.db_path()).expect("open store")
    }
}
