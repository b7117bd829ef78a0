use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type of a notification event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewBooking,
    BookingConfirmation,
    BookingCancelled,
    RentalReminder,
    ReturnReminder,
    AccountEnabled,
    AccountDisabled,
    SystemAnnouncement,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 8] = [
        Self::NewBooking,
        Self::BookingConfirmation,
        Self::BookingCancelled,
        Self::RentalReminder,
        Self::ReturnReminder,
        Self::AccountEnabled,
        Self::AccountDisabled,
        Self::SystemAnnouncement,
    ];
}

impl AsRef<str> for NotificationKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::NewBooking => "NEW_BOOKING",
            Self::BookingConfirmation => "BOOKING_CONFIRMATION",
            Self::BookingCancelled => "BOOKING_CANCELLED",
            Self::RentalReminder => "RENTAL_REMINDER",
            Self::ReturnReminder => "RETURN_REMINDER",
            Self::AccountEnabled => "ACCOUNT_ENABLED",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::SystemAnnouncement => "SYSTEM_ANNOUNCEMENT",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_ref() == value)
            .ok_or_else(|| format!("Unknown notification type {}", value))
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Delivery/read state of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Read,
    Failed,
}

impl AsRef<str> for NotificationStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Read => "READ",
            Self::Failed => "FAILED",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "READ" => Ok(Self::Read),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("Unknown notification status {}", other)),
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}
