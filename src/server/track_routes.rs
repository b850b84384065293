use super::api_error::{error_message, error_status, log_error, parse_body, run_blocking};
use super::state::{GuardedEngine, ServerState};
use crate::catalog_store::{
    BatchOutcome, CatalogError, NewTrack, Track, TrackDeletion, TrackUpdate, ValidationError,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Serialize)]
struct BatchCreatedResponse {
    created: Vec<Track>,
}

#[derive(Serialize)]
struct BatchFailedResponse {
    message: String,
    failed_index: usize,
    created: Vec<Track>,
}

#[derive(Serialize)]
struct TrackDeletedResponse {
    message: &'static str,
    #[serde(flatten)]
    deletion: TrackDeletion,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, CatalogError> {
    serde_json::from_value(value)
        .map_err(|err| ValidationError::Malformed(err.to_string()).into())
}

fn batch_response(outcome: BatchOutcome) -> Response {
    match outcome.failure {
        None => (
            StatusCode::CREATED,
            Json(BatchCreatedResponse {
                created: outcome.created,
            }),
        )
            .into_response(),
        Some(failure) => {
            log_error(&failure.error);
            let body = BatchFailedResponse {
                message: error_message(&failure.error),
                failed_index: failure.index,
                created: outcome.created,
            };
            (error_status(&failure.error), Json(body)).into_response()
        }
    }
}

/// POST /v1/tracks - an object creates one track, an array creates a batch.
async fn post_tracks(
    State(engine): State<GuardedEngine>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let body = parse_body(payload)?;
    if let Value::Array(items) = body {
        let entries: Vec<_> = items.into_iter().map(decode::<NewTrack>).collect();
        let outcome = run_blocking(engine, move |e| e.create_track_entries(entries)).await?;
        info!("Batch created {} tracks", outcome.created.len());
        return Ok(batch_response(outcome));
    }

    let input: NewTrack = decode(body)?;
    let track = run_blocking(engine, move |e| e.create_track(&input)).await?;
    info!("Created track {}", track.id);
    Ok((StatusCode::CREATED, Json(track)).into_response())
}

async fn get_tracks(State(engine): State<GuardedEngine>) -> Result<Response, CatalogError> {
    let tracks = run_blocking(engine, |e| e.get_all_tracks()).await?;
    Ok(Json(tracks).into_response())
}

async fn get_track(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let track = run_blocking(engine, move |e| e.get_track(&id)).await?;
    Ok(Json(track).into_response())
}

async fn get_resolved_track(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let resolved = run_blocking(engine, move |e| e.query().resolved_track(&id)).await?;
    Ok(Json(resolved).into_response())
}

async fn get_track_links(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let links = run_blocking(engine, move |e| e.query().links_for_track(&id)).await?;
    Ok(Json(links).into_response())
}

async fn put_track(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
    payload: Result<Json<TrackUpdate>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let update = parse_body(payload)?;
    let track = run_blocking(engine, move |e| e.update_track(&id, &update)).await?;
    Ok(Json(track).into_response())
}

async fn delete_track(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let deletion = run_blocking(engine, move |e| e.delete_track(&id)).await?;
    Ok(Json(TrackDeletedResponse {
        message: "Track deleted successfully",
        deletion,
    })
    .into_response())
}

async fn post_track_artist(
    State(engine): State<GuardedEngine>,
    Path((id, artist_id)): Path<(String, String)>,
) -> Result<Response, CatalogError> {
    let link = run_blocking(engine, move |e| e.link_artist(&id, &artist_id)).await?;
    Ok((StatusCode::CREATED, Json(link)).into_response())
}

async fn delete_track_artist(
    State(engine): State<GuardedEngine>,
    Path((id, artist_id)): Path<(String, String)>,
) -> Result<Response, CatalogError> {
    run_blocking(engine, move |e| e.unlink_artist(&id, &artist_id)).await?;
    Ok(Json(MessageResponse {
        message: "Link removed",
    })
    .into_response())
}

async fn post_track_album(
    State(engine): State<GuardedEngine>,
    Path((id, album_id)): Path<(String, String)>,
) -> Result<Response, CatalogError> {
    let link = run_blocking(engine, move |e| e.link_album(&id, &album_id)).await?;
    Ok((StatusCode::CREATED, Json(link)).into_response())
}

async fn delete_track_album(
    State(engine): State<GuardedEngine>,
    Path((id, album_id)): Path<(String, String)>,
) -> Result<Response, CatalogError> {
    run_blocking(engine, move |e| e.unlink_album(&id, &album_id)).await?;
    Ok(Json(MessageResponse {
        message: "Link removed",
    })
    .into_response())
}

pub fn make_track_routes(state: ServerState) -> Router {
    Router::new()
        .route("/v1/tracks", post(post_tracks).get(get_tracks))
        .route(
            "/v1/tracks/{id}",
            get(get_track).put(put_track).delete(delete_track),
        )
        .route("/v1/tracks/{id}/resolved", get(get_resolved_track))
        .route("/v1/tracks/{id}/links", get(get_track_links))
        .route(
            "/v1/tracks/{id}/artists/{artist_id}",
            post(post_track_artist).delete(delete_track_artist),
        )
        .route(
            "/v1/tracks/{id}/albums/{album_id}",
            post(post_track_album).delete(delete_track_album),
        )
        .with_state(state)
}
