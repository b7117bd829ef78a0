//! Messages sent to owners and renters when a booking changes state.

use crate::domain::{EmailAddress, NotificationKind, DISPLAY_DATE_FORMAT};
use crate::model::{Booking, Car, NewNotification, RelatedEntity, BOOKING_ENTITY_TYPE};

/// A booking state change that owners and renters are told about
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    BookingCreated { booking: Booking, car: Car },
    BookingCancelled { booking: Booking, car: Car },
    PickupDue { booking: Booking, car: Car },
    ReturnDue { booking: Booking, car: Car },
}

impl LifecycleEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            Self::BookingCreated { booking, .. }
            | Self::BookingCancelled { booking, .. }
            | Self::PickupDue { booking, .. }
            | Self::ReturnDue { booking, .. } => booking,
        }
    }

    /// Render the notifications this event produces, one per recipient
    pub fn notices(&self) -> Vec<NewNotification> {
        match self {
            Self::BookingCreated { booking, car } => vec![
                new_booking_for_owner(booking, car),
                confirmation_for_renter(booking, car),
            ],
            Self::BookingCancelled { booking, car } => vec![
                cancellation_for_owner(booking, car),
                cancellation_for_renter(booking, car),
            ],
            Self::PickupDue { booking, car } => vec![pickup_reminder(booking, car)],
            Self::ReturnDue { booking, car } => vec![return_reminder(booking, car)],
        }
    }
}

fn notice(
    booking: &Booking,
    recipient: &EmailAddress,
    kind: NotificationKind,
    title: &str,
    body: String,
) -> NewNotification {
    NewNotification {
        recipient: recipient.clone(),
        kind,
        title: title.to_string(),
        body,
        related: Some(RelatedEntity {
            id: booking.id,
            entity_type: BOOKING_ENTITY_TYPE.to_string(),
        }),
    }
}

fn start(booking: &Booking) -> String {
    booking.period.start().format(DISPLAY_DATE_FORMAT).to_string()
}

fn end(booking: &Booking) -> String {
    booking.period.end().format(DISPLAY_DATE_FORMAT).to_string()
}

fn new_booking_for_owner(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "Your {} has been booked from {} to {} by {}. \
         Contact the renter at {} to arrange the handover.",
        car.display_name(),
        start(booking),
        end(booking),
        booking.renter_email,
        booking.renter.phone_number.as_ref(),
    );
    notice(
        booking,
        &booking.owner_email,
        NotificationKind::NewBooking,
        "New car booking received!",
        body,
    )
}

fn confirmation_for_renter(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "Your booking of the {} from {} to {} is confirmed. \
         Remember to bring your driving license and identity card at pickup.",
        car.display_name(),
        start(booking),
        end(booking),
    );
    notice(
        booking,
        &booking.renter_email,
        NotificationKind::BookingConfirmation,
        "Booking confirmed!",
        body,
    )
}

fn cancellation_for_owner(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "The booking of your {} from {} to {} has been cancelled.",
        car.display_name(),
        start(booking),
        end(booking),
    );
    notice(
        booking,
        &booking.owner_email,
        NotificationKind::BookingCancelled,
        "Booking cancelled",
        body,
    )
}

fn cancellation_for_renter(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "Your booking of the {} from {} to {} has been cancelled.",
        car.display_name(),
        start(booking),
        end(booking),
    );
    notice(
        booking,
        &booking.renter_email,
        NotificationKind::BookingCancelled,
        "Your booking has been cancelled",
        body,
    )
}

fn pickup_reminder(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "Don't forget to pick up your rented {} tomorrow ({}). \
         Bring your driving license and identity card.",
        car.display_name(),
        start(booking),
    );
    notice(
        booking,
        &booking.renter_email,
        NotificationKind::RentalReminder,
        "Reminder: car pickup tomorrow",
        body,
    )
}

fn return_reminder(booking: &Booking, car: &Car) -> NewNotification {
    let body = format!(
        "Don't forget to return your rented {} on time tomorrow ({}).",
        car.display_name(),
        end(booking),
    );
    notice(
        booking,
        &booking.renter_email,
        NotificationKind::ReturnReminder,
        "Reminder: car return tomorrow",
        body,
    )
}
