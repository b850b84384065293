use axum::extract::FromRef;

use crate::catalog_store::ConsistencyEngine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedEngine = Arc<ConsistencyEngine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedEngine,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, engine: GuardedEngine) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            engine,
            hash: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
