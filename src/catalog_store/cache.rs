//! In-process cache for the full track listing.

use super::models::Track;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub const ALL_TRACKS_KEY: &str = "tracks:all";

/// Default lifetime of a cached listing (8 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(8 * 60 * 60);

struct Entry {
    tracks: Vec<Track>,
    stored_at: Instant,
}

pub struct TracksCache {
    enabled: bool,
    ttl: Duration,
    entries: RwLock<HashMap<&'static str, Entry>>,
    generation: AtomicU64,
}

impl TracksCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, DEFAULT_TTL)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &str) -> Option<Vec<Track>> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.tracks.clone())
    }

    /// Read before loading a listing and passed back to `put`, so a listing
    /// loaded across a write is never stored.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn put(&self, key: &'static str, generation: u64, tracks: Vec<Track>) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if generation != self.generation() {
                return;
            }
            entries.insert(
                key,
                Entry {
                    tracks,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drops every cached listing. Called after each committed write.
    pub fn invalidate(&self) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            entries.clear();
        }
    }
}

impl Default for TracksCache {
    fn default() -> Self {
        Self::disabled()
    }
}
