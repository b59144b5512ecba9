//! Optimistic synchronizers: local state changes applied before server
//! confirmation, with a defined rollback path on failure.

mod chat;
mod likes;

pub use chat::ChatSync;
pub use likes::{LikeSync, ToggleOutcome};
