// src/storage/mod.rs

use async_trait::async_trait;

use crate::error::ClientError;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Well-known keys shared with the web client's local storage layout.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_ID: &str = "userId";
    pub const USER_NAME: &str = "userName";
    pub const ROLE: &str = "role";
    pub const CHILDREN: &str = "children";
    pub const IS_APPROVED: &str = "isApproved";

    /// Every key owned by the session; cleared together on logout.
    pub const SESSION_KEYS: [&str; 6] = [TOKEN, USER_ID, USER_NAME, ROLE, CHILDREN, IS_APPROVED];
}

/// Durable string-keyed storage that survives process restarts.
///
/// Implementations must make `set_many` / `remove_many` all-or-nothing.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    async fn remove(&self, key: &str) -> Result<(), ClientError>;

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), ClientError>;

    async fn remove_many(&self, keys: &[&str]) -> Result<(), ClientError>;

    /// Releases underlying resources. Further calls may fail.
    async fn close(&self) {}
}
