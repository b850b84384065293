mod api_error;
pub mod config;
mod entity_routes;
mod http_layers;
pub mod metrics;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;
mod track_routes;

pub use api_error::ErrorResponse;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
