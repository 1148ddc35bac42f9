// Library root for the Skills Hub API

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mapper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use db::Database;
pub use error::{ApiError, StoreError};
pub use routes::create_router;
pub use state::AppState;
pub use store::{CatalogStore, FallbackStore, FileStore};
