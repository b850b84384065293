//! CRUD routes shared by artists, albums and genres.

use super::api_error::{parse_body, run_blocking};
use super::state::{GuardedEngine, ServerState};
use crate::catalog_store::{
    Album, Artist, CatalogError, CatalogResult, ConsistencyEngine, EntityDeletion, EntityRename,
    Genre, NamedEntity, NewEntity, Track,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// The per-kind pieces that differ between the three entity collections.
trait CatalogEntity: NamedEntity + Serialize + Send + 'static {
    const COLLECTION: &'static str;

    fn delete(engine: &ConsistencyEngine, id: &str) -> CatalogResult<EntityDeletion>;

    fn tracks(engine: &ConsistencyEngine, id: &str) -> CatalogResult<Vec<Track>>;
}

impl CatalogEntity for Artist {
    const COLLECTION: &'static str = "artists";

    fn delete(engine: &ConsistencyEngine, id: &str) -> CatalogResult<EntityDeletion> {
        engine.delete_artist(id)
    }

    fn tracks(engine: &ConsistencyEngine, id: &str) -> CatalogResult<Vec<Track>> {
        engine.get_tracks_by_artist(id)
    }
}

impl CatalogEntity for Album {
    const COLLECTION: &'static str = "albums";

    fn delete(engine: &ConsistencyEngine, id: &str) -> CatalogResult<EntityDeletion> {
        engine.delete_album(id)
    }

    fn tracks(engine: &ConsistencyEngine, id: &str) -> CatalogResult<Vec<Track>> {
        engine.query().tracks_by_album(id)
    }
}

impl CatalogEntity for Genre {
    const COLLECTION: &'static str = "genres";

    fn delete(engine: &ConsistencyEngine, id: &str) -> CatalogResult<EntityDeletion> {
        engine.delete_genre(id)
    }

    fn tracks(engine: &ConsistencyEngine, id: &str) -> CatalogResult<Vec<Track>> {
        engine.query().tracks_by_genre(id)
    }
}

#[derive(Serialize)]
struct EntityDeletedResponse {
    message: String,
    #[serde(flatten)]
    deletion: EntityDeletion,
}

async fn post_entity<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
    payload: Result<Json<NewEntity>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let input = parse_body(payload)?;
    let entity = run_blocking(engine, move |e| e.create_entity::<T>(&input)).await?;
    Ok((StatusCode::CREATED, Json(entity)).into_response())
}

async fn list_entities<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
) -> Result<Response, CatalogError> {
    let entities = run_blocking(engine, |e| e.list_entities::<T>()).await?;
    Ok(Json(entities).into_response())
}

async fn get_entity<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let entity = run_blocking(engine, move |e| e.get_entity::<T>(&id)).await?;
    Ok(Json(entity).into_response())
}

async fn put_entity<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
    payload: Result<Json<EntityRename>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let rename = parse_body(payload)?;
    let entity = run_blocking(engine, move |e| e.rename_entity::<T>(&id, &rename.name)).await?;
    Ok(Json(entity).into_response())
}

async fn delete_entity<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let deletion = run_blocking(engine, move |e| T::delete(e, &id)).await?;
    Ok(Json(EntityDeletedResponse {
        message: format!("{} deleted successfully", T::KIND),
        deletion,
    })
    .into_response())
}

async fn get_entity_tracks<T: CatalogEntity>(
    State(engine): State<GuardedEngine>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let tracks = run_blocking(engine, move |e| T::tracks(e, &id)).await?;
    Ok(Json(tracks).into_response())
}

fn collection_routes<T: CatalogEntity>() -> Router<ServerState> {
    let collection = format!("/v1/{}", T::COLLECTION);
    Router::new()
        .route(&collection, get(list_entities::<T>).post(post_entity::<T>))
        .route(
            &format!("{}/{{id}}", collection),
            get(get_entity::<T>)
                .put(put_entity::<T>)
                .delete(delete_entity::<T>),
        )
        .route(
            &format!("{}/{{id}}/tracks", collection),
            get(get_entity_tracks::<T>),
        )
}

pub fn make_entity_routes(state: ServerState) -> Router {
    Router::new()
        .merge(collection_routes::<Artist>())
        .merge(collection_routes::<Album>())
        .merge(collection_routes::<Genre>())
        .with_state(state)
}
