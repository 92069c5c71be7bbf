//! Notification delivery.
//!
//! Delivery is a side channel: callers go through [`notify_best_effort`] and
//! [`broadcast_best_effort`], which log and count failures instead of
//! returning them.

use std::future::Future;

use metrics::counter;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::metrics::{NOTIFY_BROADCAST_ROWS, NOTIFY_FAILED, NOTIFY_SENT};
use crate::models::{Broadcast, NewNotification};
use crate::store::Store;

/// Something that can persist notifications.
pub trait Dispatch: Send + Sync {
    /// Writes a single notification.
    fn notify(&self, notification: NewNotification) -> impl Future<Output = Result<()>> + Send;

    /// Writes one notification per profile except `broadcast.exclude`, all or
    /// nothing. Returns the number of rows written.
    fn broadcast(&self, broadcast: Broadcast) -> impl Future<Output = Result<u64>> + Send;
}

/// Writes notifications into the engine's own database.
#[derive(Debug, Clone)]
pub struct SqliteDispatcher {
    store: Store,
}

impl SqliteDispatcher {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl Dispatch for SqliteDispatcher {
    async fn notify(&self, notification: NewNotification) -> Result<()> {
        let id = self
            .store
            .insert_notification(&notification)
            .await
            .map_err(EngineError::dispatch)?;

        counter!(NOTIFY_SENT).increment(1);
        debug!(%id, kind = %notification.kind, "notification written");
        Ok(())
    }

    async fn broadcast(&self, broadcast: Broadcast) -> Result<u64> {
        let rows = self
            .store
            .insert_broadcast(&broadcast)
            .await
            .map_err(EngineError::dispatch)?;

        counter!(NOTIFY_BROADCAST_ROWS).increment(rows);
        debug!(rows, kind = %broadcast.kind, "broadcast written");
        Ok(rows)
    }
}

/// Sends `notification`, swallowing any failure.
pub(crate) async fn notify_best_effort<D: Dispatch>(dispatch: &D, notification: NewNotification) {
    let kind = notification.kind;
    let recipient = notification.recipient_id;

    if let Err(e) = dispatch.notify(notification).await {
        counter!(NOTIFY_FAILED).increment(1);
        warn!(%kind, %recipient, "dropped notification: {e}");
    }
}

/// Sends `broadcast`, swallowing any failure. Returns the rows written, 0 on
/// failure.
pub(crate) async fn broadcast_best_effort<D: Dispatch>(dispatch: &D, broadcast: Broadcast) -> u64 {
    let kind = broadcast.kind;

    match dispatch.broadcast(broadcast).await {
        Ok(rows) => rows,
        Err(e) => {
            counter!(NOTIFY_FAILED).increment(1);
            warn!(%kind, "dropped broadcast: {e}");
            0
        }
    }
}
