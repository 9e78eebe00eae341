// src/notifications.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::{api::NotificationApi, utils::task::TaskHandle};

/// Periodically refreshes the unread notification count.
///
/// The poll stops when the watcher is cancelled or dropped.
pub struct UnreadCountWatcher {
    task: TaskHandle,
    count_rx: watch::Receiver<u64>,
}

impl UnreadCountWatcher {
    pub fn spawn(api: Arc<dyn NotificationApi>, token: String, period: Duration) -> Self {
        let (count_tx, count_rx) = watch::channel(0);

        let task = TaskHandle::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match api.unread_count(&token).await {
                    Ok(count) => {
                        count_tx.send_if_modified(|current| {
                            let changed = *current != count;
                            *current = count;
                            changed
                        });
                    }
                    Err(e) => tracing::warn!("Failed to poll unread notifications: {}", e),
                }
            }
        });

        Self { task, count_rx }
    }

    pub fn count(&self) -> u64 {
        *self.count_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count_rx.clone()
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}
