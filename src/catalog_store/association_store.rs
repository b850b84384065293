//! Storage for the track link tables.
//!
//! Links are addressed by endpoint rowids. Resolving ids to rowids, and
//! deciding whether an endpoint exists, is the caller's job.

use super::entity_store::{track_from_row, NamedEntity, TRACK_COLUMNS};
use super::models::{LinkKind, Track, TrackLink};
use rusqlite::{params, Connection, OptionalExtension};

pub trait AssociationStore {
    /// Inserts a link and returns its rowid. Fails with a UNIQUE violation if
    /// the pair is already linked.
    fn insert_link(&self, kind: LinkKind, track_rowid: i64, target_rowid: i64)
        -> rusqlite::Result<i64>;
    fn link_exists(&self, kind: LinkKind, track_rowid: i64, target_rowid: i64)
        -> rusqlite::Result<bool>;
    fn delete_link(&self, kind: LinkKind, track_rowid: i64, target_rowid: i64)
        -> rusqlite::Result<usize>;
    fn delete_links_for_track(&self, kind: LinkKind, track_rowid: i64) -> rusqlite::Result<usize>;
    fn delete_links_for_target(&self, kind: LinkKind, target_rowid: i64)
        -> rusqlite::Result<usize>;
    fn links_for_track(&self, kind: LinkKind, track_rowid: i64) -> rusqlite::Result<Vec<TrackLink>>;
    fn linked_targets<T: NamedEntity>(
        &self,
        kind: LinkKind,
        track_rowid: i64,
    ) -> rusqlite::Result<Vec<T>>;
    fn tracks_linked_to(&self, kind: LinkKind, target_rowid: i64) -> rusqlite::Result<Vec<Track>>;
}

fn target_table(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Artist => "artists",
        LinkKind::Album => "albums",
    }
}

impl AssociationStore for Connection {
    fn insert_link(
        &self,
        kind: LinkKind,
        track_rowid: i64,
        target_rowid: i64,
    ) -> rusqlite::Result<i64> {
        self.prepare_cached(&format!(
            "INSERT INTO {} (track_rowid, {}) VALUES (?1, ?2)",
            kind.table(),
            kind.target_column()
        ))?
        .execute(params![track_rowid, target_rowid])?;
        Ok(self.last_insert_rowid())
    }

    fn link_exists(
        &self,
        kind: LinkKind,
        track_rowid: i64,
        target_rowid: i64,
    ) -> rusqlite::Result<bool> {
        Ok(self
            .prepare_cached(&format!(
                "SELECT 1 FROM {} WHERE track_rowid = ?1 AND {} = ?2",
                kind.table(),
                kind.target_column()
            ))?
            .query_row(params![track_rowid, target_rowid], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn delete_link(
        &self,
        kind: LinkKind,
        track_rowid: i64,
        target_rowid: i64,
    ) -> rusqlite::Result<usize> {
        self.prepare_cached(&format!(
            "DELETE FROM {} WHERE track_rowid = ?1 AND {} = ?2",
            kind.table(),
            kind.target_column()
        ))?
        .execute(params![track_rowid, target_rowid])
    }

    fn delete_links_for_track(&self, kind: LinkKind, track_rowid: i64) -> rusqlite::Result<usize> {
        self.prepare_cached(&format!(
            "DELETE FROM {} WHERE track_rowid = ?1",
            kind.table()
        ))?
        .execute(params![track_rowid])
    }

    fn delete_links_for_target(
        &self,
        kind: LinkKind,
        target_rowid: i64,
    ) -> rusqlite::Result<usize> {
        self.prepare_cached(&format!(
            "DELETE FROM {} WHERE {} = ?1",
            kind.table(),
            kind.target_column()
        ))?
        .execute(params![target_rowid])
    }

    fn links_for_track(&self, kind: LinkKind, track_rowid: i64) -> rusqlite::Result<Vec<TrackLink>> {
        self.prepare_cached(&format!(
            "SELECT l.rowid, t.id, x.id, l.created
             FROM {link} l
             JOIN tracks t ON t.rowid = l.track_rowid
             JOIN {target} x ON x.rowid = l.{column}
             WHERE l.track_rowid = ?1
             ORDER BY l.rowid",
            link = kind.table(),
            target = target_table(kind),
            column = kind.target_column()
        ))?
        .query_map(params![track_rowid], |r| {
            Ok(TrackLink {
                link_id: r.get(0)?,
                kind,
                track_id: r.get(1)?,
                target_id: r.get(2)?,
                created: r.get(3)?,
            })
        })?
        .collect()
    }

    fn linked_targets<T: NamedEntity>(
        &self,
        kind: LinkKind,
        track_rowid: i64,
    ) -> rusqlite::Result<Vec<T>> {
        self.prepare_cached(&format!(
            "SELECT x.id, x.name FROM {link} l
             JOIN {target} x ON x.rowid = l.{column}
             WHERE l.track_rowid = ?1
             ORDER BY l.rowid",
            link = kind.table(),
            target = T::TABLE,
            column = kind.target_column()
        ))?
        .query_map(params![track_rowid], |r| {
            Ok(T::from_parts(r.get(0)?, r.get(1)?))
        })?
        .collect()
    }

    fn tracks_linked_to(&self, kind: LinkKind, target_rowid: i64) -> rusqlite::Result<Vec<Track>> {
        self.prepare_cached(&format!(
            "SELECT {columns} JOIN {link} l ON l.track_rowid = t.rowid
             WHERE l.{column} = ?1
             ORDER BY t.rowid",
            columns = TRACK_COLUMNS,
            link = kind.table(),
            column = kind.target_column()
        ))?
        .query_map(params![target_rowid], track_from_row)?
        .collect()
    }
}
