//! SQLite-backed catalog store handle.
//!
//! One write connection behind a mutex serializes every mutation, each of
//! which runs inside its own `BEGIN IMMEDIATE` transaction. Reads are spread
//! round-robin over a pool of read-only WAL connections.

use super::entity_store::EntityStore;
use super::error::{CatalogError, CatalogResult};
use super::models::CatalogCounts;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::ops::Deref;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub read_pool_size: usize,
    /// Also used as SQLite's busy timeout on the write connection.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            read_pool_size: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// The instant after which a store operation must fail instead of commit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Deadline {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    fn timed_out(&self) -> CatalogError {
        CatalogError::Timeout(self.budget)
    }

    /// SQLite reports a busy database without knowing the caller's budget.
    fn stamp(&self, err: CatalogError) -> CatalogError {
        match err {
            CatalogError::Timeout(_) => self.timed_out(),
            other => other,
        }
    }
}

fn poisoned() -> CatalogError {
    anyhow!("Catalog connection lock poisoned").into()
}

/// A connection lent to one caller at a time. Waiters sleep on a condition
/// variable until the current lease is dropped or their deadline passes.
struct ConnectionSlot {
    conn: Mutex<Connection>,
    leased: Mutex<bool>,
    returned: Condvar,
}

impl ConnectionSlot {
    fn new(conn: Connection) -> Self {
        ConnectionSlot {
            conn: Mutex::new(conn),
            leased: Mutex::new(false),
            returned: Condvar::new(),
        }
    }

    fn acquire(&self, deadline: Deadline) -> CatalogResult<Lease<'_>> {
        let leased = self.leased.lock().map_err(|_| poisoned())?;
        let (mut leased, _) = self
            .returned
            .wait_timeout_while(leased, deadline.remaining(), |leased| *leased)
            .map_err(|_| poisoned())?;
        if *leased {
            return Err(deadline.timed_out());
        }
        *leased = true;
        drop(leased);

        match self.conn.lock() {
            Ok(conn) => Ok(Lease { slot: self, conn }),
            Err(_) => {
                self.release();
                Err(poisoned())
            }
        }
    }

    fn release(&self) {
        if let Ok(mut leased) = self.leased.lock() {
            *leased = false;
        }
        self.returned.notify_one();
    }
}

pub(crate) struct Lease<'a> {
    slot: &'a ConnectionSlot,
    conn: MutexGuard<'a, Connection>,
}

impl Deref for Lease<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.slot.release();
    }
}

pub struct SqliteCatalogStore {
    db_path: PathBuf,
    write_conn: ConnectionSlot,
    read_pool: Vec<ConnectionSlot>,
    read_index: AtomicUsize,
    closed: AtomicBool,
}

impl SqliteCatalogStore {
    /// Opens (creating if needed) the catalog database at `db_path`, migrates
    /// it to the latest schema and opens the read pool.
    pub fn open<P: AsRef<Path>>(db_path: P, config: &StoreConfig) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;

        write_conn.pragma_update(None, "foreign_keys", true)?;
        write_conn.busy_timeout(config.busy_timeout)?;
        migrate_if_needed(&mut write_conn, CATALOG_VERSIONED_SCHEMAS)
            .context("Failed to prepare catalog schema")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let mut read_pool = Vec::with_capacity(config.read_pool_size.max(1));
        for _ in 0..config.read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .context("Failed to open catalog read connection")?;
            read_conn.busy_timeout(config.busy_timeout)?;
            read_pool.push(ConnectionSlot::new(read_conn));
        }

        let store = SqliteCatalogStore {
            db_path: db_path.to_path_buf(),
            write_conn: ConnectionSlot::new(write_conn),
            read_pool,
            read_index: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };

        let counts = store.counts()?;
        info!(
            "Opened catalog: {} tracks, {} artists, {} albums, {} genres, {} artist links, {} album links",
            counts.tracks,
            counts.artists,
            counts.albums,
            counts.genres,
            counts.artist_links,
            counts.album_links
        );
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checkpoints the WAL and refuses any further operation. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let conn = self
            .write_conn
            .conn
            .lock()
            .map_err(|_| anyhow!("Catalog connection lock poisoned"))?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("Failed to checkpoint catalog WAL")?;
        info!("Closed catalog store at {:?}", self.db_path);
        Ok(())
    }

    fn ensure_open(&self) -> CatalogResult<()> {
        if self.is_closed() {
            return Err(anyhow!("Catalog store is closed").into());
        }
        Ok(())
    }

    fn next_read_conn(&self) -> &ConnectionSlot {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        &self.read_pool[index]
    }

    /// Runs `op` on a read-only connection.
    pub fn read<T>(
        &self,
        deadline: Deadline,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        self.ensure_open()?;
        let conn = self.next_read_conn().acquire(deadline)?;
        op(&conn).map_err(|err| deadline.stamp(err))
    }

    /// Runs `op` inside one write transaction.
    ///
    /// Any error from `op`, or reaching the deadline before commit, rolls the
    /// whole transaction back. SQLite reporting the database busy or locked
    /// surfaces as `Timeout`.
    pub fn write_tx<T>(
        &self,
        deadline: Deadline,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        self.run_write_tx(deadline, op)
            .map_err(|err| deadline.stamp(err))
    }

    fn run_write_tx<T>(
        &self,
        deadline: Deadline,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        self.ensure_open()?;
        let conn = self.write_conn.acquire(deadline)?;
        if deadline.expired() {
            return Err(deadline.timed_out());
        }

        conn.execute_batch("BEGIN IMMEDIATE")?;
        let result = op(&conn).and_then(|value| {
            if deadline.expired() {
                Err(deadline.timed_out())
            } else {
                Ok(value)
            }
        });

        match result {
            Ok(value) => match conn.execute_batch("COMMIT") {
                Ok(()) => Ok(value),
                Err(err) => {
                    rollback(&conn);
                    Err(err.into())
                }
            },
            Err(err) => {
                debug!("Rolling back catalog transaction: {}", err);
                rollback(&conn);
                Err(err)
            }
        }
    }

    pub fn counts(&self) -> CatalogResult<CatalogCounts> {
        self.read(Deadline::after(Duration::from_secs(5)), |conn| {
            Ok(CatalogCounts {
                artists: conn.count_rows("artists")?,
                albums: conn.count_rows("albums")?,
                genres: conn.count_rows("genres")?,
                tracks: conn.count_rows("tracks")?,
                artist_links: conn.count_rows("track_artists")?,
                album_links: conn.count_rows("track_albums")?,
            })
        })
    }

    #[cfg(test)]
    pub(crate) fn hold_write_lock(&self) -> Lease<'_> {
        self.write_conn
            .acquire(Deadline::after(Duration::from_secs(5)))
            .unwrap()
    }
}

fn rollback(conn: &Connection) {
    if let Err(err) = conn.execute_batch("ROLLBACK") {
        warn!("Failed to roll back catalog transaction: {}", err);
    }
}
