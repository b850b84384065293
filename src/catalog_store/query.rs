//! Read-only collection queries anchored on an artist, album, genre or track.
//!
//! Every query checks its anchor first, so a missing anchor is reported as
//! `NotFound` instead of an empty list.

use super::association_store::AssociationStore;
use super::entity_store::{EntityStore, NamedEntity};
use super::error::{CatalogError, CatalogResult};
use super::models::{
    Album, Artist, EntityKind, Genre, LinkKind, ResolvedTrack, Track, TrackLink,
};
use super::store::{Deadline, SqliteCatalogStore};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;

pub struct QueryFacade {
    store: Arc<SqliteCatalogStore>,
    timeout: Duration,
}

fn anchor<T: NamedEntity>(conn: &Connection, id: &str) -> CatalogResult<i64> {
    conn.named_rowid::<T>(id)?
        .ok_or_else(|| CatalogError::not_found(T::KIND, id))
}

fn track_anchor(conn: &Connection, id: &str) -> CatalogResult<i64> {
    conn.track_rowid(id)?
        .ok_or_else(|| CatalogError::not_found(EntityKind::Track, id))
}

impl QueryFacade {
    pub fn new(store: Arc<SqliteCatalogStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        self.store.read(Deadline::after(self.timeout), op)
    }

    pub fn tracks_by_artist(&self, artist_id: &str) -> CatalogResult<Vec<Track>> {
        self.read(|conn| {
            let rowid = anchor::<Artist>(conn, artist_id)?;
            Ok(conn.tracks_linked_to(LinkKind::Artist, rowid)?)
        })
    }

    pub fn tracks_by_album(&self, album_id: &str) -> CatalogResult<Vec<Track>> {
        self.read(|conn| {
            let rowid = anchor::<Album>(conn, album_id)?;
            Ok(conn.tracks_linked_to(LinkKind::Album, rowid)?)
        })
    }

    pub fn tracks_by_genre(&self, genre_id: &str) -> CatalogResult<Vec<Track>> {
        self.read(|conn| {
            let rowid = anchor::<Genre>(conn, genre_id)?;
            Ok(conn.tracks_with_genre(rowid)?)
        })
    }

    pub fn resolved_track(&self, track_id: &str) -> CatalogResult<ResolvedTrack> {
        self.read(|conn| {
            let rowid = track_anchor(conn, track_id)?;
            let track = conn
                .get_track(track_id)?
                .ok_or_else(|| CatalogError::not_found(EntityKind::Track, track_id))?;
            let genre = match &track.genre_id {
                Some(genre_id) => conn.get_named::<Genre>(genre_id)?,
                None => None,
            };
            Ok(ResolvedTrack {
                artists: conn.linked_targets(LinkKind::Artist, rowid)?,
                albums: conn.linked_targets(LinkKind::Album, rowid)?,
                genre,
                track,
            })
        })
    }

    pub fn links_for_track(&self, track_id: &str) -> CatalogResult<Vec<TrackLink>> {
        self.read(|conn| {
            let rowid = track_anchor(conn, track_id)?;
            let mut links = Vec::new();
            for kind in LinkKind::ALL {
                links.extend(conn.links_for_track(kind, rowid)?);
            }
            Ok(links)
        })
    }
}
