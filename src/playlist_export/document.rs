use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Only the exact text `"true"` counts as collaborative. JSON booleans, other
/// strings, `null` and a missing field all read as `false`.
fn collaborative_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::String(s)) if s == "true"))
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportDocument {
    pub playlists: Vec<ExportPlaylist>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportPlaylist {
    pub pid: i64,
    pub name: String,
    #[serde(default, deserialize_with = "collaborative_flag")]
    pub collaborative: bool,
    pub modified_at: i64,
    pub num_tracks: i64,
    pub num_albums: i64,
    pub num_artists: i64,
    pub num_followers: i64,
    pub num_edits: i64,
    pub duration_ms: i64,
    pub tracks: Vec<ExportTrack>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExportTrack {
    pub pos: i64,
    pub artist_name: String,
    pub artist_uri: String,
    pub track_name: String,
    pub track_uri: String,
    pub album_name: String,
    pub album_uri: String,
    pub duration_ms: i64,
}
