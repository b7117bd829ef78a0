use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{EmailAddress, NotificationKind, NotificationStatus};

/// Reference from a notification to the record it is about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedEntity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Rendered notification, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient: EmailAddress,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related: Option<RelatedEntity>,
}

/// Stored notification record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: EmailAddress,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related: Option<RelatedEntity>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// `None` while the recipient has not acknowledged the notification
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}
