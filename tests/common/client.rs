//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per catalog endpoint. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Response {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.expect("POST request failed")
    }

    async fn put(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn get_stats(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Builds a track creation body pointing at the given references.
    pub fn track_body(name: &str, artist_id: &str, album_id: &str, genre_id: &str) -> Value {
        json!({
            "name": name,
            "url": format!("https://media.example.com/{}.mp3", name),
            "genre_id": genre_id,
            "artist_id": artist_id,
            "album_id": album_id,
        })
    }

    /// POST /v1/tracks with an object or an array body
    pub async fn create_tracks(&self, body: &Value) -> Response {
        self.post("/v1/tracks", Some(body)).await
    }

    /// POST /v1/tracks with a raw, possibly invalid, body
    pub async fn create_track_raw(&self, body: &str) -> Response {
        self.client
            .post(self.url("/v1/tracks"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed")
    }

    /// GET /v1/tracks
    pub async fn get_tracks(&self) -> Response {
        self.get("/v1/tracks").await
    }

    /// GET /v1/tracks/{id}
    pub async fn get_track(&self, id: &str) -> Response {
        self.get(&format!("/v1/tracks/{}", id)).await
    }

    /// GET /v1/tracks/{id}/resolved
    pub async fn get_resolved_track(&self, id: &str) -> Response {
        self.get(&format!("/v1/tracks/{}/resolved", id)).await
    }

    /// GET /v1/tracks/{id}/links
    pub async fn get_track_links(&self, id: &str) -> Response {
        self.get(&format!("/v1/tracks/{}/links", id)).await
    }

    /// PUT /v1/tracks/{id}
    pub async fn update_track(&self, id: &str, body: &Value) -> Response {
        self.put(&format!("/v1/tracks/{}", id), body).await
    }

    /// DELETE /v1/tracks/{id}
    pub async fn delete_track(&self, id: &str) -> Response {
        self.delete(&format!("/v1/tracks/{}", id)).await
    }

    /// POST /v1/tracks/{id}/artists/{artist_id}
    pub async fn link_artist(&self, track_id: &str, artist_id: &str) -> Response {
        self.post(&format!("/v1/tracks/{}/artists/{}", track_id, artist_id), None)
            .await
    }

    /// DELETE /v1/tracks/{id}/artists/{artist_id}
    pub async fn unlink_artist(&self, track_id: &str, artist_id: &str) -> Response {
        self.delete(&format!("/v1/tracks/{}/artists/{}", track_id, artist_id))
            .await
    }

    /// POST /v1/tracks/{id}/albums/{album_id}
    pub async fn link_album(&self, track_id: &str, album_id: &str) -> Response {
        self.post(&format!("/v1/tracks/{}/albums/{}", track_id, album_id), None)
            .await
    }

    /// DELETE /v1/tracks/{id}/albums/{album_id}
    pub async fn unlink_album(&self, track_id: &str, album_id: &str) -> Response {
        self.delete(&format!("/v1/tracks/{}/albums/{}", track_id, album_id))
            .await
    }

    // ========================================================================
    // Artists, albums, genres
    // ========================================================================
    //
    // `collection` is one of "artists", "albums", "genres".

    /// POST /v1/{collection}
    pub async fn create_entity(&self, collection: &str, id: Option<&str>, name: &str) -> Response {
        let body = match id {
            Some(id) => json!({ "id": id, "name": name }),
            None => json!({ "name": name }),
        };
        self.post(&format!("/v1/{}", collection), Some(&body)).await
    }

    /// GET /v1/{collection}
    pub async fn list_entities(&self, collection: &str) -> Response {
        self.get(&format!("/v1/{}", collection)).await
    }

    /// GET /v1/{collection}/{id}
    pub async fn get_entity(&self, collection: &str, id: &str) -> Response {
        self.get(&format!("/v1/{}/{}", collection, id)).await
    }

    /// PUT /v1/{collection}/{id}
    pub async fn rename_entity(&self, collection: &str, id: &str, name: &str) -> Response {
        self.put(
            &format!("/v1/{}/{}", collection, id),
            &json!({ "name": name }),
        )
        .await
    }

    /// DELETE /v1/{collection}/{id}
    pub async fn delete_entity(&self, collection: &str, id: &str) -> Response {
        self.delete(&format!("/v1/{}/{}", collection, id)).await
    }

    /// GET /v1/{collection}/{id}/tracks
    pub async fn get_entity_tracks(&self, collection: &str, id: &str) -> Response {
        self.get(&format!("/v1/{}/{}/tracks", collection, id)).await
    }
}
