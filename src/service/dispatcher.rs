use std::sync::Arc;

use chrono::{DateTime, Utc};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use uuid::Uuid;

use crate::client::{DeliveryChannel, Email};
use crate::domain::{EmailAddress, NotificationStatus};
use crate::error::NotificationError;
use crate::model::{NewNotification, Notification};
use crate::repo::{RepoResult, Store};
use crate::service::{Clock, LifecycleEvent};

/// Receiver of booking lifecycle events, invoked after the booking change is committed.
/// Publishing never fails from the caller's point of view.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: LifecycleEvent);
}

/// Persists, delivers and tracks the read state of notifications
pub struct Dispatcher {
    store: Arc<dyn Store>,
    channel: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        channel: Arc<dyn DeliveryChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            channel,
            clock,
        }
    }

    /// Store a notification, then hand it to the delivery channel.
    ///
    /// The returned record carries the delivery outcome: `Sent` on success, `Failed` otherwise.
    /// Only a failure to store the notification in the first place is returned as an error.
    #[tracing::instrument(
        name = "Create and send a notification",
        skip(self, new_notification),
        fields(recipient = %new_notification.recipient, kind = %new_notification.kind)
    )]
    pub async fn create_and_send(&self, new_notification: NewNotification) -> RepoResult<Notification> {
        let mut notification = self
            .store
            .insert_notification(&new_notification, self.clock.now())
            .await?;

        let email = Email::from_text(&notification.title, &notification.body);
        let (status, sent_at) = match self.channel.deliver(&notification.recipient, &email).await {
            Ok(()) => (NotificationStatus::Sent, Some(self.clock.now())),
            Err(error) => {
                tracing::error!(
                    error.cause_chain = ?error,
                    "Failed to deliver notification {}", notification.id
                );
                (NotificationStatus::Failed, None)
            }
        };

        match self
            .store
            .set_delivery_status(notification.id, status, sent_at)
            .await
        {
            Ok(Some(stored)) => Ok(stored),
            // Purged while in flight
            Ok(None) => {
                notification.status = status;
                notification.sent_at = sent_at;
                Ok(notification)
            }
            Err(error) => {
                tracing::error!(
                    error.cause_chain = ?error,
                    "Failed to record delivery status of notification {}", notification.id
                );
                Ok(notification)
            }
        }
    }

    #[tracing::instrument(name = "Fetch a notification", skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Notification, NotificationError> {
        self.store
            .fetch_notification(id)
            .await?
            .ok_or(NotificationError::NotFound(id))
    }

    /// Acknowledge a single notification. Already read notifications keep their first read time.
    #[tracing::instrument(name = "Mark a notification as read", skip(self))]
    pub async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), NotificationError> {
        if !self.store.mark_read(id, at).await? && self.store.fetch_notification(id).await?.is_none() {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }

    /// Acknowledge every unread notification of a recipient, returns how many changed
    #[tracing::instrument(name = "Mark all notifications as read", skip(self))]
    pub async fn mark_all_read(&self, recipient: &EmailAddress, at: DateTime<Utc>) -> RepoResult<u64> {
        self.store.mark_all_read(recipient, at).await
    }

    #[tracing::instrument(name = "Fetch unread notifications", skip(self))]
    pub async fn unread(&self, recipient: &EmailAddress) -> RepoResult<Vec<Notification>> {
        self.store.fetch_unread_for(recipient).await
    }

    #[tracing::instrument(name = "Count unread notifications", skip(self))]
    pub async fn unread_count(&self, recipient: &EmailAddress) -> RepoResult<i64> {
        self.store.count_unread_for(recipient).await
    }

    #[tracing::instrument(name = "Fetch notification history", skip(self))]
    pub async fn history(&self, recipient: &EmailAddress) -> RepoResult<Vec<Notification>> {
        self.store.fetch_notifications_for(recipient).await
    }

    /// Delete notifications created before `cutoff`, returns how many were removed
    #[tracing::instrument(name = "Purge old notifications", skip(self))]
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let deleted = self.store.delete_created_before(cutoff).await?;
        tracing::info!("Purged {} notifications created before {}", deleted, cutoff);
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl NotificationSink for Dispatcher {
    async fn publish(&self, event: LifecycleEvent) {
        for notice in event.notices() {
            if let Err(error) = self.create_and_send(notice).await {
                tracing::error!(
                    error.cause_chain = ?error,
                    "Failed to store notification for booking {}", event.booking().id
                );
            }
        }
    }
}

/// Sink handing events to a background worker over a bounded queue
#[derive(Clone)]
pub struct QueuedSink {
    sender: mpsc::Sender<LifecycleEvent>,
}

impl QueuedSink {
    /// Spawn the worker draining the queue into `dispatcher`.
    /// The worker stops once every sender has been dropped.
    pub fn spawn(dispatcher: Arc<Dispatcher>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                dispatcher.publish(event).await;
            }
            tracing::debug!("Notification queue closed");
        });

        (Self { sender }, worker)
    }
}

#[async_trait::async_trait]
impl NotificationSink for QueuedSink {
    async fn publish(&self, event: LifecycleEvent) {
        let booking_id = event.booking().id;
        if self.sender.send(event).await.is_err() {
            tracing::error!("Notification queue closed, dropping event for booking {}", booking_id);
        }
    }
}
