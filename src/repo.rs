mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, NaiveDate, Utc};

use uuid::Uuid;

use crate::domain::{
    DateRange, EmailAddress, LicensePlate, NationalRegisterId, NotificationKind, NotificationStatus,
};
use crate::model::{
    Booking, Car, NewBooking, NewCar, NewNotification, NewRental, Notification, Rental,
};

/// Wrapper for repository results
pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A uniqueness, exclusion or foreign key constraint rejected the write
    #[error("Conflicting record: {0}")]
    Conflict(String),
    /// A stored row could not be converted back into a domain record
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        // 23503: foreign_key_violation, 23505: unique_violation, 23P01: exclusion_violation
        let conflict = e
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| matches!(&*code, "23503" | "23505" | "23P01"))
            .unwrap_or(false);

        if conflict {
            Self::Conflict(e.to_string())
        } else {
            Self::Database(e)
        }
    }
}

/// Car repository
/// NOTE: Implemented for every storage backend, intended to facilitate easier testing
#[async_trait::async_trait]
pub trait CarRepo: Send + Sync {
    /// Insert a new car, fails with `Conflict` when the license plate is taken
    async fn insert_car(&self, new_car: &NewCar, created_at: DateTime<Utc>) -> RepoResult<Car>;

    /// Replace every field of an existing car
    async fn update_car(
        &self,
        id: Uuid,
        car: &NewCar,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Car>>;

    async fn fetch_car(&self, id: Uuid) -> RepoResult<Option<Car>>;

    async fn fetch_car_by_plate(&self, plate: &LicensePlate) -> RepoResult<Option<Car>>;

    async fn fetch_cars(&self) -> RepoResult<Vec<Car>>;

    async fn fetch_available_cars(&self) -> RepoResult<Vec<Car>>;

    async fn fetch_cars_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Car>>;
}

/// Booking queries outside of a unit of work.
/// Every list is ordered by start date, then id.
#[async_trait::async_trait]
pub trait BookingRepo: Send + Sync {
    async fn fetch_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn fetch_bookings(&self) -> RepoResult<Vec<Booking>>;

    async fn fetch_bookings_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Booking>>;

    async fn fetch_bookings_by_renter(&self, renter: &EmailAddress) -> RepoResult<Vec<Booking>>;

    async fn fetch_bookings_by_register_id(
        &self,
        register_id: &NationalRegisterId,
    ) -> RepoResult<Vec<Booking>>;

    /// Bookings of a car overlapping `range` (inclusive on both ends)
    async fn fetch_overlapping(&self, car_id: Uuid, range: &DateRange) -> RepoResult<Vec<Booking>>;

    /// Bookings of a car whose end date is on or after `as_of`
    async fn fetch_ending_on_or_after(
        &self,
        car_id: Uuid,
        as_of: NaiveDate,
    ) -> RepoResult<Vec<Booking>>;

    async fn fetch_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>>;

    async fn fetch_ending_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>>;
}

/// Rental offer repository.
/// Every list is ordered by start date, then start time, then id.
#[async_trait::async_trait]
pub trait RentalRepo: Send + Sync {
    /// Insert a new offer, fails with `Conflict` when the car does not exist
    async fn insert_rental(
        &self,
        new_rental: &NewRental,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Rental>;

    /// Replace every field of an existing offer, fails with `Conflict` when the car does not exist
    async fn update_rental(&self, id: Uuid, rental: &NewRental) -> RepoResult<Option<Rental>>;

    async fn fetch_rental(&self, id: Uuid) -> RepoResult<Option<Rental>>;

    async fn fetch_rentals(&self) -> RepoResult<Vec<Rental>>;

    async fn fetch_rentals_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Rental>>;

    async fn fetch_rentals_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Rental>>;

    async fn fetch_rentals_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Rental>>;

    /// Offers picked up in `city`, compared case-insensitively
    async fn fetch_rentals_in_city(&self, city: &str) -> RepoResult<Vec<Rental>>;

    async fn delete_rental(&self, id: Uuid) -> RepoResult<bool>;
}

/// Notification repository. Every list is ordered newest first.
#[async_trait::async_trait]
pub trait NotificationRepo: Send + Sync {
    /// Insert a new notification in the `Pending` state
    async fn insert_notification(
        &self,
        new_notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Notification>;

    /// Record the delivery outcome and return the stored notification, `None` when it is gone.
    /// A notification read in the meantime keeps its `Read` status, only `sent_at` is recorded.
    async fn set_delivery_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<Notification>>;

    async fn fetch_notification(&self, id: Uuid) -> RepoResult<Option<Notification>>;

    async fn fetch_notifications_for(&self, recipient: &EmailAddress)
        -> RepoResult<Vec<Notification>>;

    async fn fetch_unread_for(&self, recipient: &EmailAddress) -> RepoResult<Vec<Notification>>;

    async fn count_unread_for(&self, recipient: &EmailAddress) -> RepoResult<i64>;

    /// Mark a single unread notification as read, returns whether a row changed
    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> RepoResult<bool>;

    /// Mark every unread notification of a recipient as read, returns the number of rows changed
    async fn mark_all_read(&self, recipient: &EmailAddress, read_at: DateTime<Utc>)
        -> RepoResult<u64>;

    /// Whether a notification of `kind` about the related entity `related_id` exists
    async fn notification_exists(
        &self,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> RepoResult<bool>;

    /// Delete every notification created before `cutoff`, returns the number of rows deleted
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64>;
}

/// Atomic unit of work over cars and bookings.
/// Changes are discarded unless `commit` is called.
#[async_trait::async_trait]
pub trait UnitOfWork: Send {
    /// Fetch a car and hold it until the unit of work ends.
    /// Admissions for the same car are serialized on this lock.
    async fn lock_car(&mut self, id: Uuid) -> RepoResult<Option<Car>>;

    async fn overlapping_bookings(
        &mut self,
        car_id: Uuid,
        range: &DateRange,
    ) -> RepoResult<Vec<Booking>>;

    async fn insert_booking(
        &mut self,
        new_booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Booking>;

    async fn fetch_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn bookings_for_car(&mut self, car_id: Uuid) -> RepoResult<Vec<Booking>>;

    async fn delete_booking(&mut self, id: Uuid) -> RepoResult<bool>;

    /// Delete a car together with all of its bookings and rental offers
    async fn delete_car(&mut self, id: Uuid) -> RepoResult<bool>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;
}

/// Persistence store consumed by the services
#[async_trait::async_trait]
pub trait Store: CarRepo + BookingRepo + RentalRepo + NotificationRepo {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>>;
}
