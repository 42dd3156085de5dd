//! Protostar Server
//!
//! HTTP service that scores user posts for hateful content, stores them with
//! their score and lets each account hide posts above its own hate level.

pub mod accounts;
pub mod config;
pub mod routes;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
pub use store::Store;
