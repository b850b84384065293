//! Shared constants for end-to-end tests
//!
//! When the seeded catalog changes, update only this file.

// ============================================================================
// Test Catalog IDs
// ============================================================================

/// Artist ID for "The Test Band"
pub const ARTIST_1_ID: &str = "artist-1";
pub const ARTIST_1_NAME: &str = "The Test Band";

/// Artist ID for "Jazz Ensemble"
pub const ARTIST_2_ID: &str = "artist-2";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

/// Album ID for "First Album"
pub const ALBUM_1_ID: &str = "album-1";
pub const ALBUM_1_TITLE: &str = "First Album";

/// Album ID for "Jazz Collection"
pub const ALBUM_2_ID: &str = "album-2";
pub const ALBUM_2_TITLE: &str = "Jazz Collection";

pub const GENRE_1_ID: &str = "genre-1";
pub const GENRE_1_NAME: &str = "Rock";

pub const GENRE_2_ID: &str = "genre-2";
pub const GENRE_2_NAME: &str = "Jazz";

/// "Opening Track" by The Test Band on First Album
pub const TRACK_1_ID: &str = "track-1";
pub const TRACK_1_TITLE: &str = "Opening Track";

/// "Closing Track" by The Test Band on First Album
pub const TRACK_2_ID: &str = "track-2";

/// "Smooth Jazz" by Jazz Ensemble on Jazz Collection
pub const TRACK_3_ID: &str = "track-3";

pub const SEEDED_TRACKS: usize = 3;

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for the test server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Poll interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
