//! Catalog entities and the request/response shapes built around them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// =============================================================================
// Entities
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// A track row. Artist and album membership lives in the link tables, the
/// genre is a single nullable reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub genre_id: Option<String>,
}

/// Which kind of entity an id refers to, used when reporting missing rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Track,
    Artist,
    Album,
    Genre,
    Link,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Track => "Track",
            EntityKind::Artist => "Artist",
            EntityKind::Album => "Album",
            EntityKind::Genre => "Genre",
            EntityKind::Link => "Link",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Links
// =============================================================================

/// The two many-to-many associations a track takes part in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Artist,
    Album,
}

impl LinkKind {
    pub const ALL: [LinkKind; 2] = [LinkKind::Artist, LinkKind::Album];

    pub fn table(&self) -> &'static str {
        match self {
            LinkKind::Artist => "track_artists",
            LinkKind::Album => "track_albums",
        }
    }

    /// Column holding the rowid of the non-track endpoint.
    pub fn target_column(&self) -> &'static str {
        match self {
            LinkKind::Artist => "artist_rowid",
            LinkKind::Album => "album_rowid",
        }
    }

    pub fn target_kind(&self) -> EntityKind {
        match self {
            LinkKind::Artist => EntityKind::Artist,
            LinkKind::Album => EntityKind::Album,
        }
    }
}

/// A join record between a track and an artist or album.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackLink {
    pub link_id: i64,
    pub kind: LinkKind,
    pub track_id: String,
    pub target_id: String,
    /// Unix timestamp, seconds.
    pub created: i64,
}

// =============================================================================
// Inputs
// =============================================================================

/// How a caller points at a genre when creating or updating a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenreRef {
    Id(String),
    Name(String),
}

impl GenreRef {
    pub fn as_str(&self) -> &str {
        match self {
            GenreRef::Id(s) | GenreRef::Name(s) => s,
        }
    }
}

/// Body of a track creation. Exactly one of `genre_id` / `genre_name` must be
/// given.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub genre_id: Option<String>,
    #[serde(default)]
    pub genre_name: Option<String>,
    pub artist_id: String,
    pub album_id: String,
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a track. `artist_id` / `album_id` replace the whole link
/// set of that kind. `"thumbnail": null` clears the thumbnail.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(deserialize_with = "present")]
    pub thumbnail: Option<Option<String>>,
    pub genre_id: Option<String>,
    pub genre_name: Option<String>,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
}

impl TrackUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.thumbnail.is_none()
            && self.genre_id.is_none()
            && self.genre_name.is_none()
            && self.artist_id.is_none()
            && self.album_id.is_none()
    }
}

/// Body used to create an artist, album or genre.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewEntity {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EntityRename {
    pub name: String,
}

// =============================================================================
// Outputs
// =============================================================================

/// A track together with everything it references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedTrack {
    pub track: Track,
    pub genre: Option<Genre>,
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackDeletion {
    pub artist_links_removed: usize,
    pub album_links_removed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityDeletion {
    /// Links removed for artists and albums, tracks detached for genres.
    pub references_removed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: usize,
    pub albums: usize,
    pub genres: usize,
    pub tracks: usize,
    pub artist_links: usize,
    pub album_links: usize,
}
