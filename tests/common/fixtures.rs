//! Test catalog creation
//!
//! The catalog is seeded through the engine so fixtures obey the same
//! reference checks as requests do.

use super::constants::*;
use anyhow::Result;
use music_catalog_server::catalog_store::{
    Album, Artist, ConsistencyEngine, Genre, NewEntity, NewTrack, SqliteCatalogStore,
    StoreConfig, TracksCache,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn entity(id: &str, name: &str) -> NewEntity {
    NewEntity {
        id: Some(id.to_string()),
        name: name.to_string(),
    }
}

fn track(id: &str, name: &str, artist_id: &str, album_id: &str, genre_id: &str) -> NewTrack {
    NewTrack {
        id: Some(id.to_string()),
        name: name.to_string(),
        url: format!("https://media.example.com/{}.mp3", id),
        genre_id: Some(genre_id.to_string()),
        artist_id: artist_id.to_string(),
        album_id: album_id.to_string(),
        ..Default::default()
    }
}

/// Creates a temporary catalog with 2 artists, 2 albums, 2 genres, 3 tracks
/// Returns (temp_dir, engine)
pub fn create_test_catalog() -> Result<(TempDir, Arc<ConsistencyEngine>)> {
    let dir = TempDir::new()?;
    let store = Arc::new(SqliteCatalogStore::open(
        dir.path().join("catalog.db"),
        &StoreConfig::default(),
    )?);
    let engine = ConsistencyEngine::new(store, TracksCache::disabled(), Duration::from_secs(5));

    engine.create_entity::<Artist>(&entity(ARTIST_1_ID, ARTIST_1_NAME))?;
    engine.create_entity::<Artist>(&entity(ARTIST_2_ID, ARTIST_2_NAME))?;
    engine.create_entity::<Album>(&entity(ALBUM_1_ID, ALBUM_1_TITLE))?;
    engine.create_entity::<Album>(&entity(ALBUM_2_ID, ALBUM_2_TITLE))?;
    engine.create_entity::<Genre>(&entity(GENRE_1_ID, GENRE_1_NAME))?;
    engine.create_entity::<Genre>(&entity(GENRE_2_ID, GENRE_2_NAME))?;

    engine.create_track(&track(TRACK_1_ID, TRACK_1_TITLE, ARTIST_1_ID, ALBUM_1_ID, GENRE_1_ID))?;
    engine.create_track(&track(TRACK_2_ID, "Closing Track", ARTIST_1_ID, ALBUM_1_ID, GENRE_1_ID))?;
    engine.create_track(&track(TRACK_3_ID, "Smooth Jazz", ARTIST_2_ID, ALBUM_2_ID, GENRE_2_ID))?;

    Ok((dir, Arc::new(engine)))
}
