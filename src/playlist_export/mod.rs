//! Playlist export files: one JSON document per file with a top-level
//! `playlists` array, each playlist carrying its `tracks`.

mod document;
mod parse;

pub use document::{ExportDocument, ExportPlaylist, ExportTrack};
pub use parse::{parse_file, parse_str, ParseError, ParsedFile};
