// src/lib.rs

pub mod api;
pub mod assessment;
pub mod assignments;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod session;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export specific items for convenience if needed
pub use error::ClientError;
pub use state::ClientState;
