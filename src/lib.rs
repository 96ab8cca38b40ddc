//! Playlist Loader Library
//!
//! Loads a corpus of playlist export files into a SQLite database. The modules
//! are exposed for the binary and for end-to-end tests.

pub mod config;
pub mod load;
pub mod playlist_export;
pub mod playlist_store;
pub mod sqlite_persistence;

pub use config::{AppConfig, CliConfig, FileConfig};
pub use load::{run, LoadReport, LoadState};
pub use playlist_store::{AssociationPolicy, SqlitePlaylistStore};
