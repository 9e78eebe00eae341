// src/models/notification.rs

use serde::Deserialize;

/// Response of `GET notifications/unread-count`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCount {
    #[serde(alias = "unreadCount")]
    pub count: u64,
}
