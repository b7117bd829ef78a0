mod bookings;
mod cars;
mod notifications;
mod rentals;

use chrono::{DateTime, NaiveDate, Utc};

use sqlx::{PgPool, Postgres, Transaction};

use uuid::Uuid;

use crate::domain::{
    DateRange, EmailAddress, LicensePlate, NationalRegisterId, NotificationKind, NotificationStatus,
};
use crate::model::{
    Booking, Car, NewBooking, NewCar, NewNotification, NewRental, Notification, Rental,
};

use super::{
    BookingRepo, CarRepo, NotificationRepo, RentalRepo, RepoError, RepoResult, Store, UnitOfWork,
};

/// Postgres-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded schema migrations
    #[tracing::instrument(name = "Run database migrations", skip(self))]
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Parse a column value back into a domain type
fn parse_column<T, E: ToString>(column: &str, parsed: Result<T, E>) -> RepoResult<T> {
    parsed.map_err(|e| RepoError::Corrupt(format!("{}: {}", column, e.to_string())))
}

/// Convert a list of rows into domain records
fn convert_all<R, T>(rows: Vec<R>) -> RepoResult<Vec<T>>
where
    R: TryInto<T, Error = RepoError>,
{
    rows.into_iter().map(TryInto::try_into).collect()
}

#[async_trait::async_trait]
impl CarRepo for PgStore {
    async fn insert_car(&self, new_car: &NewCar, created_at: DateTime<Utc>) -> RepoResult<Car> {
        cars::insert(&self.pool, new_car, created_at).await
    }

    async fn update_car(
        &self,
        id: Uuid,
        car: &NewCar,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Car>> {
        cars::update(&self.pool, id, car, updated_at).await
    }

    async fn fetch_car(&self, id: Uuid) -> RepoResult<Option<Car>> {
        cars::fetch_by_id(&self.pool, id).await
    }

    async fn fetch_car_by_plate(&self, plate: &LicensePlate) -> RepoResult<Option<Car>> {
        cars::fetch_by_plate(&self.pool, plate).await
    }

    async fn fetch_cars(&self) -> RepoResult<Vec<Car>> {
        cars::fetch_all(&self.pool).await
    }

    async fn fetch_available_cars(&self) -> RepoResult<Vec<Car>> {
        cars::fetch_available(&self.pool).await
    }

    async fn fetch_cars_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Car>> {
        cars::fetch_by_owner(&self.pool, owner).await
    }
}

#[async_trait::async_trait]
impl BookingRepo for PgStore {
    async fn fetch_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        bookings::fetch_by_id(&self.pool, id, false).await
    }

    async fn fetch_bookings(&self) -> RepoResult<Vec<Booking>> {
        bookings::fetch_all(&self.pool).await
    }

    async fn fetch_bookings_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Booking>> {
        bookings::fetch_by_car(&self.pool, car_id).await
    }

    async fn fetch_bookings_by_renter(&self, renter: &EmailAddress) -> RepoResult<Vec<Booking>> {
        bookings::fetch_by_renter(&self.pool, renter).await
    }

    async fn fetch_bookings_by_register_id(
        &self,
        register_id: &NationalRegisterId,
    ) -> RepoResult<Vec<Booking>> {
        bookings::fetch_by_register_id(&self.pool, register_id).await
    }

    async fn fetch_overlapping(&self, car_id: Uuid, range: &DateRange) -> RepoResult<Vec<Booking>> {
        bookings::fetch_overlapping(&self.pool, car_id, range).await
    }

    async fn fetch_ending_on_or_after(
        &self,
        car_id: Uuid,
        as_of: NaiveDate,
    ) -> RepoResult<Vec<Booking>> {
        bookings::fetch_ending_on_or_after(&self.pool, car_id, as_of).await
    }

    async fn fetch_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>> {
        bookings::fetch_starting_on(&self.pool, day).await
    }

    async fn fetch_ending_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>> {
        bookings::fetch_ending_on(&self.pool, day).await
    }
}

#[async_trait::async_trait]
impl RentalRepo for PgStore {
    async fn insert_rental(
        &self,
        new_rental: &NewRental,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Rental> {
        rentals::insert(&self.pool, new_rental, created_at).await
    }

    async fn update_rental(&self, id: Uuid, rental: &NewRental) -> RepoResult<Option<Rental>> {
        rentals::update(&self.pool, id, rental).await
    }

    async fn fetch_rental(&self, id: Uuid) -> RepoResult<Option<Rental>> {
        rentals::fetch_by_id(&self.pool, id).await
    }

    async fn fetch_rentals(&self) -> RepoResult<Vec<Rental>> {
        rentals::fetch_all(&self.pool).await
    }

    async fn fetch_rentals_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Rental>> {
        rentals::fetch_by_car(&self.pool, car_id).await
    }

    async fn fetch_rentals_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Rental>> {
        rentals::fetch_by_owner(&self.pool, owner).await
    }

    async fn fetch_rentals_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Rental>> {
        rentals::fetch_starting_on(&self.pool, day).await
    }

    async fn fetch_rentals_in_city(&self, city: &str) -> RepoResult<Vec<Rental>> {
        rentals::fetch_in_city(&self.pool, city).await
    }

    async fn delete_rental(&self, id: Uuid) -> RepoResult<bool> {
        rentals::delete(&self.pool, id).await
    }
}

#[async_trait::async_trait]
impl NotificationRepo for PgStore {
    async fn insert_notification(
        &self,
        new_notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Notification> {
        notifications::insert(&self.pool, new_notification, created_at).await
    }

    async fn set_delivery_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<Notification>> {
        notifications::set_delivery_status(&self.pool, id, status, sent_at).await
    }

    async fn fetch_notification(&self, id: Uuid) -> RepoResult<Option<Notification>> {
        notifications::fetch_by_id(&self.pool, id).await
    }

    async fn fetch_notifications_for(
        &self,
        recipient: &EmailAddress,
    ) -> RepoResult<Vec<Notification>> {
        notifications::fetch_for_recipient(&self.pool, recipient, false).await
    }

    async fn fetch_unread_for(&self, recipient: &EmailAddress) -> RepoResult<Vec<Notification>> {
        notifications::fetch_for_recipient(&self.pool, recipient, true).await
    }

    async fn count_unread_for(&self, recipient: &EmailAddress) -> RepoResult<i64> {
        notifications::count_unread(&self.pool, recipient).await
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> RepoResult<bool> {
        notifications::mark_read(&self.pool, id, read_at).await
    }

    async fn mark_all_read(
        &self,
        recipient: &EmailAddress,
        read_at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        notifications::mark_all_read(&self.pool, recipient, read_at).await
    }

    async fn notification_exists(
        &self,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> RepoResult<bool> {
        notifications::exists(&self.pool, kind, related_id).await
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        notifications::delete_created_before(&self.pool, cutoff).await
    }
}

/// Unit of work wrapping a database transaction
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_car(&mut self, id: Uuid) -> RepoResult<Option<Car>> {
        cars::lock_by_id(&mut *self.tx, id).await
    }

    async fn overlapping_bookings(
        &mut self,
        car_id: Uuid,
        range: &DateRange,
    ) -> RepoResult<Vec<Booking>> {
        bookings::fetch_overlapping(&mut *self.tx, car_id, range).await
    }

    async fn insert_booking(
        &mut self,
        new_booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Booking> {
        bookings::insert(&mut *self.tx, new_booking, created_at).await
    }

    async fn fetch_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>> {
        bookings::fetch_by_id(&mut *self.tx, id, true).await
    }

    async fn bookings_for_car(&mut self, car_id: Uuid) -> RepoResult<Vec<Booking>> {
        bookings::fetch_by_car(&mut *self.tx, car_id).await
    }

    async fn delete_booking(&mut self, id: Uuid) -> RepoResult<bool> {
        bookings::delete(&mut *self.tx, id).await
    }

    async fn delete_car(&mut self, id: Uuid) -> RepoResult<bool> {
        // Bookings and rentals are removed by the foreign key cascade
        cars::delete(&mut *self.tx, id).await
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}
