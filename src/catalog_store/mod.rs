mod association_store;
mod cache;
mod engine;
mod entity_store;
mod error;
mod models;
mod query;
mod schema;
mod store;
mod validation;

pub use association_store::AssociationStore;
pub use cache::{TracksCache, DEFAULT_TTL as DEFAULT_TRACKS_CACHE_TTL};
pub use engine::{BatchFailure, BatchOutcome, ConsistencyEngine};
pub use entity_store::{EntityStore, NamedEntity};
pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use query::QueryFacade;
pub use store::{Deadline, SqliteCatalogStore, StoreConfig};
pub use validation::ValidationError;
