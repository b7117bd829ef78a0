use std::sync::Arc;

use chrono::NaiveDate;

use uuid::Uuid;

use crate::domain::{DateRange, EmailAddress, NationalRegisterId};
use crate::error::BookingError;
use crate::model::{Booking, NewBooking, RenterProfile};
use crate::repo::{RepoError, Store};
use crate::service::{
    first_conflict, Clock, LifecycleEvent, NotificationSink, ReservationCalendar,
};

/// A renter's request to book a car for a range of days
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub car_id: Uuid,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub renter_email: EmailAddress,
    pub renter: RenterProfile,
}

/// Admits, cancels and looks up bookings
#[derive(Clone)]
pub struct BookingManager {
    store: Arc<dyn Store>,
    calendar: ReservationCalendar,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn Store>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calendar = ReservationCalendar::new(store.clone());
        Self {
            store,
            calendar,
            sink,
            clock,
        }
    }

    /// Book a car.
    ///
    /// The period is validated before anything is looked up. The car is locked for the
    /// duration of the admission, so two overlapping requests for the same car can never
    /// both succeed. Owner and renter are notified once the booking is committed.
    #[tracing::instrument(
        name = "Create a booking",
        skip(self, request),
        fields(car_id = %request.car_id, renter = %request.renter_email)
    )]
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let period = DateRange::new(request.start, request.end)?;
        let car_id = request.car_id;

        let mut uow = self.store.begin().await?;

        let car = uow
            .lock_car(car_id)
            .await?
            .ok_or(BookingError::CarNotFound(car_id))?;
        if !car.available_for_rent {
            return Err(BookingError::CarUnavailable(car_id));
        }

        let overlapping = uow.overlapping_bookings(car_id, &period).await?;
        if let Some(existing) = first_conflict(&overlapping, &period) {
            tracing::info!("Requested period overlaps booking {}", existing.id);
            return Err(BookingError::AlreadyBooked { car_id, period });
        }

        let new_booking = NewBooking {
            car_id,
            period,
            owner_email: car.owner_email.clone(),
            renter_email: request.renter_email,
            renter: request.renter,
        };
        let already_booked = |e: RepoError| match e {
            RepoError::Conflict(_) => BookingError::AlreadyBooked { car_id, period },
            other => other.into(),
        };

        let booking = uow
            .insert_booking(&new_booking, self.clock.now())
            .await
            .map_err(already_booked)?;
        uow.commit().await.map_err(already_booked)?;

        tracing::info!("Booking {} created", booking.id);
        self.sink
            .publish(LifecycleEvent::BookingCreated {
                booking: booking.clone(),
                car,
            })
            .await;

        Ok(booking)
    }

    /// Cancel a booking, notifying owner and renter about the removed period.
    ///
    /// Locks are taken car first, then booking, the same order car removal uses.
    #[tracing::instrument(name = "Cancel a booking", skip(self))]
    pub async fn cancel_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        let car_id = self
            .store
            .fetch_booking(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))?
            .car_id;

        let mut uow = self.store.begin().await?;

        let car = uow.lock_car(car_id).await?;
        // Gone or moved while unlocked: the car was removed together with its bookings
        let booking = uow
            .fetch_booking(id)
            .await?
            .filter(|booking| booking.car_id == car_id)
            .ok_or(BookingError::BookingNotFound(id))?;
        let car = car.ok_or(BookingError::CarNotFound(car_id))?;

        // Built from the rows read above, the delete leaves nothing to render from
        let event = LifecycleEvent::BookingCancelled {
            booking: booking.clone(),
            car,
        };

        if !uow.delete_booking(id).await? {
            return Err(BookingError::BookingNotFound(id));
        }
        uow.commit().await?;

        tracing::info!("Booking {} cancelled", id);
        self.sink.publish(event).await;

        Ok(booking)
    }

    #[tracing::instrument(name = "Fetch a booking", skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.store
            .fetch_booking(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))
    }

    #[tracing::instrument(name = "Fetch all bookings", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.fetch_bookings().await?)
    }

    #[tracing::instrument(name = "Fetch bookings of a car", skip(self))]
    pub async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.ensure_car_exists(car_id).await?;
        Ok(self.store.fetch_bookings_by_car(car_id).await?)
    }

    #[tracing::instrument(name = "Fetch bookings of a renter", skip(self))]
    pub async fn list_by_renter(&self, renter: &EmailAddress) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.fetch_bookings_by_renter(renter).await?)
    }

    #[tracing::instrument(name = "Fetch bookings by national register id", skip(self))]
    pub async fn list_by_national_register_id(
        &self,
        register_id: &NationalRegisterId,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.fetch_bookings_by_register_id(register_id).await?)
    }

    /// Bookings of a car ending on or after `as_of`, earliest first
    pub async fn active_or_upcoming(
        &self,
        car_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<Booking>, BookingError> {
        self.ensure_car_exists(car_id).await?;
        Ok(self.calendar.active_or_upcoming(car_id, as_of).await?)
    }

    /// Free day ranges of a car inside `window`
    pub async fn availability(
        &self,
        car_id: Uuid,
        window: &DateRange,
    ) -> Result<Vec<DateRange>, BookingError> {
        self.ensure_car_exists(car_id).await?;
        Ok(self.calendar.availability(car_id, window).await?)
    }

    async fn ensure_car_exists(&self, car_id: Uuid) -> Result<(), BookingError> {
        match self.store.fetch_car(car_id).await? {
            Some(_) => Ok(()),
            None => Err(BookingError::CarNotFound(car_id)),
        }
    }
}
