//! Multi-entity catalog operations.
//!
//! `ConsistencyEngine` is the only writer of the catalog. Each operation
//! validates its input, checks that referenced rows exist, then writes the
//! entity rows and the link rows in a single transaction, so the link tables
//! never point at something that is not there.

use super::association_store::AssociationStore;
use super::cache::{TracksCache, ALL_TRACKS_KEY};
use super::entity_store::{EntityStore, NamedEntity, TrackFields};
use super::error::{CatalogError, CatalogResult};
use super::models::{
    Album, Artist, EntityDeletion, EntityKind, Genre, GenreRef, LinkKind, NewEntity, NewTrack,
    Track, TrackDeletion, TrackLink, TrackUpdate,
};
use super::query::QueryFacade;
use super::store::{Deadline, SqliteCatalogStore};
use super::validation::{
    validate_name, validate_new_entity, validate_new_track, validate_track_update,
    ValidationError,
};
use crate::server::metrics;
use anyhow::anyhow;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of a batch creation. Entries before `failure` are committed,
/// the failing entry and everything after it are not.
#[derive(Debug)]
pub struct BatchOutcome {
    pub created: Vec<Track>,
    pub failure: Option<BatchFailure>,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: CatalogError,
}

pub struct ConsistencyEngine {
    store: Arc<SqliteCatalogStore>,
    query: QueryFacade,
    cache: TracksCache,
    timeout: Duration,
}

fn resolve_track(conn: &Connection, id: &str) -> CatalogResult<i64> {
    conn.track_rowid(id)?
        .ok_or_else(|| CatalogError::not_found(EntityKind::Track, id))
}

fn resolve_genre(conn: &Connection, genre: &GenreRef) -> CatalogResult<i64> {
    conn.genre_rowid(genre)?
        .ok_or_else(|| CatalogError::not_found(EntityKind::Genre, genre.as_str()))
}

fn resolve_target(conn: &Connection, kind: LinkKind, id: &str) -> CatalogResult<i64> {
    let rowid = match kind {
        LinkKind::Artist => conn.named_rowid::<Artist>(id)?,
        LinkKind::Album => conn.named_rowid::<Album>(id)?,
    };
    rowid.ok_or_else(|| CatalogError::not_found(kind.target_kind(), id))
}

fn load_track(conn: &Connection, id: &str) -> CatalogResult<Track> {
    conn.get_track(id)?
        .ok_or_else(|| CatalogError::not_found(EntityKind::Track, id))
}

/// Replaces every link of `kind` on the track with a single link to `target_id`.
fn replace_links(
    conn: &Connection,
    kind: LinkKind,
    track_rowid: i64,
    target_id: &str,
) -> CatalogResult<()> {
    let target_rowid = resolve_target(conn, kind, target_id)?;
    conn.delete_links_for_track(kind, track_rowid)?;
    conn.insert_link(kind, track_rowid, target_rowid)?;
    Ok(())
}

impl ConsistencyEngine {
    pub fn new(store: Arc<SqliteCatalogStore>, cache: TracksCache, timeout: Duration) -> Self {
        Self {
            query: QueryFacade::new(store.clone(), timeout),
            store,
            cache,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<SqliteCatalogStore> {
        &self.store
    }

    pub fn query(&self) -> &QueryFacade {
        &self.query
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    fn write<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let result = self.store.write_tx(self.deadline(), op);
        match &result {
            Ok(_) => {
                self.cache.invalidate();
                if let Ok(counts) = self.store.counts() {
                    metrics::set_catalog_items(&counts);
                }
                metrics::record_catalog_operation(operation, "ok");
                debug!("Committed {}", operation);
            }
            Err(err) => metrics::record_catalog_operation(operation, err.label()),
        }
        result
    }

    fn read<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let result = self.store.read(self.deadline(), op);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.label(),
        };
        metrics::record_catalog_operation(operation, outcome);
        result
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Creates a track and links it to its artist and album.
    ///
    /// Missing references are reported in the order genre, artist, album. Any
    /// failure leaves neither the track nor any of its links behind.
    pub fn create_track(&self, input: &NewTrack) -> CatalogResult<Track> {
        let genre = validate_new_track(input)?;
        let track_id = input
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.write("create_track", |conn| {
            let genre_rowid = resolve_genre(conn, &genre)?;
            let track_rowid = conn.insert_track(
                &track_id,
                &input.name,
                &input.url,
                input.thumbnail.as_deref(),
                Some(genre_rowid),
            )?;

            let artist_rowid = resolve_target(conn, LinkKind::Artist, &input.artist_id)?;
            conn.insert_link(LinkKind::Artist, track_rowid, artist_rowid)?;

            let album_rowid = resolve_target(conn, LinkKind::Album, &input.album_id)?;
            conn.insert_link(LinkKind::Album, track_rowid, album_rowid)?;

            load_track(conn, &track_id)
        })
    }

    /// Creates tracks in order, each in its own transaction, stopping at the
    /// first failure.
    pub fn create_tracks(&self, inputs: &[NewTrack]) -> CatalogResult<BatchOutcome> {
        self.create_track_entries(inputs.iter().cloned().map(Ok))
    }

    /// Like `create_tracks`, for entries decoded one by one. An entry that
    /// failed to decode stops the batch at its index, after the entries
    /// before it have been committed.
    pub fn create_track_entries<I>(&self, entries: I) -> CatalogResult<BatchOutcome>
    where
        I: IntoIterator<Item = CatalogResult<NewTrack>>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let mut created = Vec::new();
        for (index, entry) in entries.enumerate() {
            match entry.and_then(|input| self.create_track(&input)) {
                Ok(track) => created.push(track),
                Err(error) => {
                    warn!(
                        "Batch creation stopped at entry {} after {} tracks: {}",
                        index,
                        created.len(),
                        error
                    );
                    return Ok(BatchOutcome {
                        created,
                        failure: Some(BatchFailure { index, error }),
                    });
                }
            }
        }
        Ok(BatchOutcome {
            created,
            failure: None,
        })
    }

    pub fn get_all_tracks(&self) -> CatalogResult<Vec<Track>> {
        if let Some(tracks) = self.cache.get(ALL_TRACKS_KEY) {
            return Ok(tracks);
        }

        let generation = self.cache.generation();
        let tracks = self.read("get_all_tracks", |conn| Ok(conn.list_tracks()?))?;
        if tracks.is_empty() {
            warn!("No tracks have been found");
        }
        if self.cache.is_enabled() {
            self.cache.put(ALL_TRACKS_KEY, generation, tracks.clone());
        }
        Ok(tracks)
    }

    pub fn get_track(&self, id: &str) -> CatalogResult<Track> {
        self.read("get_track", |conn| load_track(conn, id))
    }

    pub fn get_tracks_by_artist(&self, artist_id: &str) -> CatalogResult<Vec<Track>> {
        self.query.tracks_by_artist(artist_id)
    }

    /// Updates scalar fields and, when given, replaces the genre, the artist
    /// links or the album links of a track.
    pub fn update_track(&self, id: &str, update: &TrackUpdate) -> CatalogResult<Track> {
        let genre = validate_track_update(update)?;

        self.write("update_track", |conn| {
            let fields = TrackFields {
                name: update.name.as_deref(),
                url: update.url.as_deref(),
                thumbnail: update.thumbnail.as_ref().map(|t| t.as_deref()),
                genre_rowid: None,
            };
            if conn.update_track(id, &fields)? == 0 {
                return Err(CatalogError::not_found(EntityKind::Track, id));
            }

            if let Some(genre) = &genre {
                let genre_fields = TrackFields {
                    genre_rowid: Some(resolve_genre(conn, genre)?),
                    ..Default::default()
                };
                conn.update_track(id, &genre_fields)?;
            }

            let track_rowid = resolve_track(conn, id)?;
            if let Some(artist_id) = &update.artist_id {
                replace_links(conn, LinkKind::Artist, track_rowid, artist_id)?;
            }
            if let Some(album_id) = &update.album_id {
                replace_links(conn, LinkKind::Album, track_rowid, album_id)?;
            }

            load_track(conn, id)
        })
    }

    /// Deletes a track together with every link that references it.
    pub fn delete_track(&self, id: &str) -> CatalogResult<TrackDeletion> {
        self.write("delete_track", |conn| {
            let track_rowid = resolve_track(conn, id)?;
            let deletion = TrackDeletion {
                artist_links_removed: conn.delete_links_for_track(LinkKind::Artist, track_rowid)?,
                album_links_removed: conn.delete_links_for_track(LinkKind::Album, track_rowid)?,
            };
            conn.delete_track(track_rowid)?;
            Ok(deletion)
        })
    }

    // =========================================================================
    // Links
    // =========================================================================

    fn link(&self, kind: LinkKind, track_id: &str, target_id: &str) -> CatalogResult<TrackLink> {
        self.write("link", |conn| {
            let track_rowid = resolve_track(conn, track_id)?;
            let target_rowid = resolve_target(conn, kind, target_id)?;
            if conn.link_exists(kind, track_rowid, target_rowid)? {
                return Err(CatalogError::Conflict(format!(
                    "Track {} is already linked to {} {}",
                    track_id,
                    kind.target_kind(),
                    target_id
                )));
            }
            let link_id = conn.insert_link(kind, track_rowid, target_rowid)?;
            conn.links_for_track(kind, track_rowid)?
                .into_iter()
                .find(|link| link.link_id == link_id)
                .ok_or_else(|| anyhow!("Link {} vanished after insert", link_id).into())
        })
    }

    fn unlink(&self, kind: LinkKind, track_id: &str, target_id: &str) -> CatalogResult<()> {
        self.write("unlink", |conn| {
            let track_rowid = resolve_track(conn, track_id)?;
            let target_rowid = resolve_target(conn, kind, target_id)?;
            if conn.delete_link(kind, track_rowid, target_rowid)? == 0 {
                return Err(CatalogError::not_found(
                    EntityKind::Link,
                    format!("{}/{}", track_id, target_id),
                ));
            }
            Ok(())
        })
    }

    pub fn link_artist(&self, track_id: &str, artist_id: &str) -> CatalogResult<TrackLink> {
        self.link(LinkKind::Artist, track_id, artist_id)
    }

    pub fn link_album(&self, track_id: &str, album_id: &str) -> CatalogResult<TrackLink> {
        self.link(LinkKind::Album, track_id, album_id)
    }

    pub fn unlink_artist(&self, track_id: &str, artist_id: &str) -> CatalogResult<()> {
        self.unlink(LinkKind::Artist, track_id, artist_id)
    }

    pub fn unlink_album(&self, track_id: &str, album_id: &str) -> CatalogResult<()> {
        self.unlink(LinkKind::Album, track_id, album_id)
    }

    // =========================================================================
    // Artists, albums, genres
    // =========================================================================

    pub fn create_entity<T: NamedEntity>(&self, input: &NewEntity) -> CatalogResult<T> {
        validate_new_entity(input)?;
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.write("create_entity", |conn| {
            conn.insert_named::<T>(&id, &input.name)?;
            Ok(T::from_parts(id.clone(), input.name.clone()))
        })
    }

    pub fn get_entity<T: NamedEntity>(&self, id: &str) -> CatalogResult<T> {
        self.read("get_entity", |conn| {
            conn.get_named::<T>(id)?
                .ok_or_else(|| CatalogError::not_found(T::KIND, id))
        })
    }

    pub fn list_entities<T: NamedEntity>(&self) -> CatalogResult<Vec<T>> {
        self.read("list_entities", |conn| Ok(conn.list_named::<T>()?))
    }

    pub fn rename_entity<T: NamedEntity>(&self, id: &str, name: &str) -> CatalogResult<T> {
        validate_name(name)?;
        self.write("rename_entity", |conn| {
            if conn.rename_named::<T>(id, name)? == 0 {
                return Err(CatalogError::not_found(T::KIND, id));
            }
            Ok(T::from_parts(id.to_string(), name.to_string()))
        })
    }

    fn delete_linked_entity<T: NamedEntity>(
        &self,
        kind: LinkKind,
        id: &str,
    ) -> CatalogResult<EntityDeletion> {
        self.write("delete_entity", |conn| {
            let rowid = resolve_target(conn, kind, id)?;
            let removed = conn.delete_links_for_target(kind, rowid)?;
            conn.delete_named::<T>(rowid)?;
            Ok(EntityDeletion {
                references_removed: removed,
            })
        })
    }

    /// Deletes an artist and its track links. Tracks stay.
    pub fn delete_artist(&self, id: &str) -> CatalogResult<EntityDeletion> {
        self.delete_linked_entity::<Artist>(LinkKind::Artist, id)
    }

    /// Deletes an album and its track links. Tracks stay.
    pub fn delete_album(&self, id: &str) -> CatalogResult<EntityDeletion> {
        self.delete_linked_entity::<Album>(LinkKind::Album, id)
    }

    /// Deletes a genre after clearing it from every track that uses it.
    pub fn delete_genre(&self, id: &str) -> CatalogResult<EntityDeletion> {
        self.write("delete_entity", |conn| {
            let rowid = resolve_genre(conn, &GenreRef::Id(id.to_string()))?;
            let detached = conn.detach_genre(rowid)?;
            conn.delete_named::<Genre>(rowid)?;
            Ok(EntityDeletion {
                references_removed: detached,
            })
        })
    }
}
