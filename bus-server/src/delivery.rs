//! Periodic delivery of due notifications.
//!
//! A sweep finds notifications that are undelivered and due, marks each
//! delivered, then hands it to a [`DeliveryChannel`]. The flag only ever
//! goes from false to true.

use std::future::Future;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::store::{
    Document, DocumentStore, NOTIFICATIONS, NotificationRecord, Order, Query, StoreError, decode,
};

/// Where delivered notifications go.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(&self, notification: &NotificationRecord) -> impl Future<Output = ()> + Send;
}

/// Writes each notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

impl DeliveryChannel for LogChannel {
    async fn deliver(&self, n: &NotificationRecord) {
        info!(
            booking = %n.booking_id,
            user = n.user_id.as_deref().unwrap_or("-"),
            kind = ?n.kind,
            message = %n.message,
            "notification delivered"
        );
    }
}

/// Deliver every notification due at `now`. Returns how many were sent.
///
/// A notification that cannot be decoded is skipped and left undelivered.
pub async fn sweep_due<S: DocumentStore, C: DeliveryChannel>(
    store: &S,
    channel: &C,
    now: NaiveDateTime,
) -> Result<usize, StoreError> {
    let due_before = serde_json::to_value(now)?;
    let query = Query::new()
        .eq("delivered", false)
        .le("timestamp", due_before)
        .order_by("timestamp", Order::Ascending);
    let due = store.query(NOTIFICATIONS, &query).await?;

    let mut sent = 0;
    for (key, doc) in due {
        let record: NotificationRecord = match decode(NOTIFICATIONS, &key, doc) {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "skipping malformed notification");
                continue;
            }
        };

        let mut flag = Document::new();
        flag.insert("delivered".into(), true.into());
        if !store.update(NOTIFICATIONS, &key, flag).await? {
            debug!(%key, "notification vanished before delivery");
            continue;
        }

        channel.deliver(&record).await;
        sent += 1;
    }

    if sent > 0 {
        info!(sent, "delivery sweep");
    }
    Ok(sent)
}
