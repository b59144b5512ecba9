pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use api::ApiClient;
pub use auth::TokenStore;
pub use client::ParlorClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use store::{Store, StoreCommand, StoreEvent};
pub use sync::{ChatSync, LikeSync, ToggleOutcome};
