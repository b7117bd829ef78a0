use std::sync::Arc;

use chrono::{Days, NaiveDate};

use crate::domain::NotificationKind;
use crate::model::Booking;
use crate::repo::{RepoResult, Store};
use crate::service::{Dispatcher, LifecycleEvent, NotificationSink};

/// Outcome of a reminder sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ReminderReport {
    pub pickup_reminders: usize,
    pub return_reminders: usize,
}

/// Sends pickup and return reminders the day before a rental starts or ends
pub struct ReminderSweep {
    store: Arc<dyn Store>,
    dispatcher: Arc<Dispatcher>,
}

impl ReminderSweep {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Remind renters whose rental starts or ends the day after `today`.
    /// A booking never receives the same kind of reminder twice.
    #[tracing::instrument(name = "Send rental reminders", skip(self))]
    pub async fn send_reminders(&self, today: NaiveDate) -> RepoResult<ReminderReport> {
        let Some(tomorrow) = today.checked_add_days(Days::new(1)) else {
            return Ok(ReminderReport::default());
        };

        let mut report = ReminderReport::default();

        for booking in self.store.fetch_starting_on(tomorrow).await? {
            if self.remind(booking, NotificationKind::RentalReminder).await? {
                report.pickup_reminders += 1;
            }
        }
        for booking in self.store.fetch_ending_on(tomorrow).await? {
            if self.remind(booking, NotificationKind::ReturnReminder).await? {
                report.return_reminders += 1;
            }
        }

        tracing::info!(
            "Sent {} pickup and {} return reminders",
            report.pickup_reminders,
            report.return_reminders
        );
        Ok(report)
    }

    async fn remind(&self, booking: Booking, kind: NotificationKind) -> RepoResult<bool> {
        if self.store.notification_exists(kind, booking.id).await? {
            return Ok(false);
        }
        let Some(car) = self.store.fetch_car(booking.car_id).await? else {
            tracing::warn!("Skipping reminder for booking {} without a car", booking.id);
            return Ok(false);
        };

        let event = match kind {
            NotificationKind::RentalReminder => LifecycleEvent::PickupDue { booking, car },
            _ => LifecycleEvent::ReturnDue { booking, car },
        };
        self.dispatcher.publish(event).await;
        Ok(true)
    }
}
