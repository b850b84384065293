//! Keyed storage for tracks, artists, albums and genres.
//!
//! Nothing here knows about links: callers (the consistency engine) decide
//! which rows must exist before others are written. Every method runs on the
//! connection it is given, so it joins whatever transaction is open on it.

use super::models::{Album, Artist, EntityKind, Genre, GenreRef, Track};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Artists, albums and genres share the same `(id, name)` row shape.
pub trait NamedEntity: Sized {
    const KIND: EntityKind;
    const TABLE: &'static str;

    fn from_parts(id: String, name: String) -> Self;
}

impl NamedEntity for Artist {
    const KIND: EntityKind = EntityKind::Artist;
    const TABLE: &'static str = "artists";

    fn from_parts(id: String, name: String) -> Self {
        Artist { id, name }
    }
}

impl NamedEntity for Album {
    const KIND: EntityKind = EntityKind::Album;
    const TABLE: &'static str = "albums";

    fn from_parts(id: String, name: String) -> Self {
        Album { id, name }
    }
}

impl NamedEntity for Genre {
    const KIND: EntityKind = EntityKind::Genre;
    const TABLE: &'static str = "genres";

    fn from_parts(id: String, name: String) -> Self {
        Genre { id, name }
    }
}

pub(crate) const TRACK_COLUMNS: &str =
    "t.id, t.name, t.url, t.thumbnail, g.id FROM tracks t LEFT JOIN genres g ON g.rowid = t.genre_rowid";

pub(crate) fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        thumbnail: row.get(3)?,
        genre_id: row.get(4)?,
    })
}

/// Scalar track fields to overwrite. `None` leaves a column untouched,
/// `Some(None)` clears the thumbnail.
#[derive(Debug, Default)]
pub struct TrackFields<'a> {
    pub name: Option<&'a str>,
    pub url: Option<&'a str>,
    pub thumbnail: Option<Option<&'a str>>,
    pub genre_rowid: Option<i64>,
}

impl TrackFields<'_> {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.thumbnail.is_none()
            && self.genre_rowid.is_none()
    }
}

pub trait EntityStore {
    fn track_rowid(&self, id: &str) -> rusqlite::Result<Option<i64>>;
    fn named_rowid<T: NamedEntity>(&self, id: &str) -> rusqlite::Result<Option<i64>>;
    fn genre_rowid(&self, genre: &GenreRef) -> rusqlite::Result<Option<i64>>;

    fn get_track(&self, id: &str) -> rusqlite::Result<Option<Track>>;
    fn list_tracks(&self) -> rusqlite::Result<Vec<Track>>;
    fn tracks_with_genre(&self, genre_rowid: i64) -> rusqlite::Result<Vec<Track>>;
    fn insert_track(
        &self,
        id: &str,
        name: &str,
        url: &str,
        thumbnail: Option<&str>,
        genre_rowid: Option<i64>,
    ) -> rusqlite::Result<i64>;
    /// Returns the number of rows matched, 0 when the track does not exist.
    fn update_track(&self, id: &str, fields: &TrackFields) -> rusqlite::Result<usize>;
    fn delete_track(&self, rowid: i64) -> rusqlite::Result<usize>;
    fn detach_genre(&self, genre_rowid: i64) -> rusqlite::Result<usize>;

    fn get_named<T: NamedEntity>(&self, id: &str) -> rusqlite::Result<Option<T>>;
    fn get_named_by_rowid<T: NamedEntity>(&self, rowid: i64) -> rusqlite::Result<Option<T>>;
    fn list_named<T: NamedEntity>(&self) -> rusqlite::Result<Vec<T>>;
    fn insert_named<T: NamedEntity>(&self, id: &str, name: &str) -> rusqlite::Result<i64>;
    fn rename_named<T: NamedEntity>(&self, id: &str, name: &str) -> rusqlite::Result<usize>;
    fn delete_named<T: NamedEntity>(&self, rowid: i64) -> rusqlite::Result<usize>;

    fn count_rows(&self, table: &str) -> rusqlite::Result<usize>;
}

impl EntityStore for Connection {
    fn track_rowid(&self, id: &str) -> rusqlite::Result<Option<i64>> {
        self.prepare_cached("SELECT rowid FROM tracks WHERE id = ?1")?
            .query_row(params![id], |r| r.get(0))
            .optional()
    }

    fn named_rowid<T: NamedEntity>(&self, id: &str) -> rusqlite::Result<Option<i64>> {
        self.prepare_cached(&format!("SELECT rowid FROM {} WHERE id = ?1", T::TABLE))?
            .query_row(params![id], |r| r.get(0))
            .optional()
    }

    fn genre_rowid(&self, genre: &GenreRef) -> rusqlite::Result<Option<i64>> {
        match genre {
            GenreRef::Id(id) => self.named_rowid::<Genre>(id),
            GenreRef::Name(name) => self
                .prepare_cached("SELECT rowid FROM genres WHERE name = ?1")?
                .query_row(params![name], |r| r.get(0))
                .optional(),
        }
    }

    fn get_track(&self, id: &str) -> rusqlite::Result<Option<Track>> {
        self.prepare_cached(&format!("SELECT {} WHERE t.id = ?1", TRACK_COLUMNS))?
            .query_row(params![id], track_from_row)
            .optional()
    }

    fn list_tracks(&self) -> rusqlite::Result<Vec<Track>> {
        self.prepare_cached(&format!("SELECT {} ORDER BY t.rowid", TRACK_COLUMNS))?
            .query_map([], track_from_row)?
            .collect()
    }

    fn tracks_with_genre(&self, genre_rowid: i64) -> rusqlite::Result<Vec<Track>> {
        self.prepare_cached(&format!(
            "SELECT {} WHERE t.genre_rowid = ?1 ORDER BY t.rowid",
            TRACK_COLUMNS
        ))?
        .query_map(params![genre_rowid], track_from_row)?
        .collect()
    }

    fn insert_track(
        &self,
        id: &str,
        name: &str,
        url: &str,
        thumbnail: Option<&str>,
        genre_rowid: Option<i64>,
    ) -> rusqlite::Result<i64> {
        self.prepare_cached(
            "INSERT INTO tracks (id, name, url, thumbnail, genre_rowid) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![id, name, url, thumbnail, genre_rowid])?;
        Ok(self.last_insert_rowid())
    }

    fn update_track(&self, id: &str, fields: &TrackFields) -> rusqlite::Result<usize> {
        if fields.is_empty() {
            // Still report whether the row exists so callers can map 0 to NotFound.
            return Ok(self.track_rowid(id)?.map_or(0, |_| 1));
        }
        self.prepare_cached(
            "UPDATE tracks SET
                name = COALESCE(?2, name),
                url = COALESCE(?3, url),
                thumbnail = CASE WHEN ?4 THEN ?5 ELSE thumbnail END,
                genre_rowid = COALESCE(?6, genre_rowid)
             WHERE id = ?1",
        )?
        .execute(params![
            id,
            fields.name,
            fields.url,
            fields.thumbnail.is_some(),
            fields.thumbnail.flatten(),
            fields.genre_rowid
        ])
    }

    fn delete_track(&self, rowid: i64) -> rusqlite::Result<usize> {
        self.prepare_cached("DELETE FROM tracks WHERE rowid = ?1")?
            .execute(params![rowid])
    }

    fn detach_genre(&self, genre_rowid: i64) -> rusqlite::Result<usize> {
        self.prepare_cached("UPDATE tracks SET genre_rowid = NULL WHERE genre_rowid = ?1")?
            .execute(params![genre_rowid])
    }

    fn get_named<T: NamedEntity>(&self, id: &str) -> rusqlite::Result<Option<T>> {
        self.prepare_cached(&format!("SELECT id, name FROM {} WHERE id = ?1", T::TABLE))?
            .query_row(params![id], |r| Ok(T::from_parts(r.get(0)?, r.get(1)?)))
            .optional()
    }

    fn get_named_by_rowid<T: NamedEntity>(&self, rowid: i64) -> rusqlite::Result<Option<T>> {
        self.prepare_cached(&format!(
            "SELECT id, name FROM {} WHERE rowid = ?1",
            T::TABLE
        ))?
        .query_row(params![rowid], |r| Ok(T::from_parts(r.get(0)?, r.get(1)?)))
        .optional()
    }

    fn list_named<T: NamedEntity>(&self) -> rusqlite::Result<Vec<T>> {
        self.prepare_cached(&format!("SELECT id, name FROM {} ORDER BY rowid", T::TABLE))?
            .query_map([], |r| Ok(T::from_parts(r.get(0)?, r.get(1)?)))?
            .collect()
    }

    fn insert_named<T: NamedEntity>(&self, id: &str, name: &str) -> rusqlite::Result<i64> {
        self.prepare_cached(&format!(
            "INSERT INTO {} (id, name) VALUES (?1, ?2)",
            T::TABLE
        ))?
        .execute(params![id, name])?;
        Ok(self.last_insert_rowid())
    }

    fn rename_named<T: NamedEntity>(&self, id: &str, name: &str) -> rusqlite::Result<usize> {
        self.prepare_cached(&format!("UPDATE {} SET name = ?2 WHERE id = ?1", T::TABLE))?
            .execute(params![id, name])
    }

    fn delete_named<T: NamedEntity>(&self, rowid: i64) -> rusqlite::Result<usize> {
        self.prepare_cached(&format!("DELETE FROM {} WHERE rowid = ?1", T::TABLE))?
            .execute(params![rowid])
    }

    fn count_rows(&self, table: &str) -> rusqlite::Result<usize> {
        self.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get::<_, i64>(0)
        })
        .map(|n| n as usize)
    }
}
