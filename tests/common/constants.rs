//! Shared constants for end-to-end tests

// ============================================================================
// Artists
// ============================================================================

pub const ARTIST_1_URI: &str = "spotify:artist:1";
pub const ARTIST_2_URI: &str = "spotify:artist:2";

// ============================================================================
// Albums
// ============================================================================

pub const ALBUM_1_URI: &str = "spotify:album:1";
pub const ALBUM_2_URI: &str = "spotify:album:2";

// ============================================================================
// Tracks
// ============================================================================

pub const TRACK_1_URI: &str = "spotify:track:1";
pub const TRACK_2_URI: &str = "spotify:track:2";
pub const TRACK_3_URI: &str = "spotify:track:3";
