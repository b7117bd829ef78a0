use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use tokio::sync::{Mutex, OwnedMutexGuard};

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

/// Cars with their bookings and rental offers, guarded together so a unit of work
/// sees a consistent snapshot
#[derive(Debug, Default, Clone)]
struct Inventory {
    cars: HashMap<Uuid, Car>,
    bookings: HashMap<Uuid, Booking>,
    rentals: HashMap<Uuid, Rental>,
}

impl Inventory {
    fn bookings_where(&self, predicate: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .values()
            .filter(|booking| predicate(booking))
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| (booking.period.start(), booking.id));
        bookings
    }

    fn cars_where(&self, predicate: impl Fn(&Car) -> bool) -> Vec<Car> {
        let mut cars: Vec<Car> = self
            .cars
            .values()
            .filter(|car| predicate(car))
            .cloned()
            .collect();
        cars.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        cars
    }

    fn rentals_where(&self, predicate: impl Fn(&Rental) -> bool) -> Vec<Rental> {
        let mut rentals: Vec<Rental> = self
            .rentals
            .values()
            .filter(|rental| predicate(rental))
            .cloned()
            .collect();
        rentals.sort_by_key(|rental| (rental.period.start(), rental.start_time, rental.id));
        rentals
    }

    fn ensure_car(&self, car_id: Uuid) -> RepoResult<()> {
        if self.cars.contains_key(&car_id) {
            Ok(())
        } else {
            Err(RepoError::Conflict(format!("Car {} does not exist", car_id)))
        }
    }

    fn plate_taken(&self, plate: &LicensePlate, except: Option<Uuid>) -> bool {
        self.cars
            .values()
            .any(|car| &car.license_plate == plate && Some(car.id) != except)
    }
}

/// In-process store backed by tokio mutexes.
///
/// A unit of work holds the inventory lock for its whole lifetime, so units of work
/// are fully serialized. Notifications live behind their own lock.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inventory: Arc<Mutex<Inventory>>,
    // Kept in insertion order
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(notifications: impl Iterator<Item = Notification>) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = notifications.collect();
    notifications.reverse();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

#[async_trait::async_trait]
impl CarRepo for MemoryStore {
    #[tracing::instrument(name = "Insert car", skip(self))]
    async fn insert_car(&self, new_car: &NewCar, created_at: DateTime<Utc>) -> RepoResult<Car> {
        let mut inventory = self.inventory.lock().await;
        if inventory.plate_taken(&new_car.license_plate, None) {
            return Err(RepoError::Conflict(format!(
                "License plate {} already registered",
                new_car.license_plate
            )));
        }

        let car = Car {
            id: Uuid::new_v4(),
            brand: new_car.brand.clone(),
            model: new_car.model.clone(),
            license_plate: new_car.license_plate.clone(),
            owner_email: new_car.owner_email.clone(),
            number_of_seats: new_car.number_of_seats,
            number_of_child_seats: new_car.number_of_child_seats,
            folding_rear_seat: new_car.folding_rear_seat,
            tow_bar: new_car.tow_bar,
            available_for_rent: new_car.available_for_rent,
            created_at,
            updated_at: created_at,
        };
        inventory.cars.insert(car.id, car.clone());
        Ok(car)
    }

    #[tracing::instrument(name = "Update car", skip(self))]
    async fn update_car(
        &self,
        id: Uuid,
        update: &NewCar,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Car>> {
        let mut inventory = self.inventory.lock().await;
        if inventory.plate_taken(&update.license_plate, Some(id)) {
            return Err(RepoError::Conflict(format!(
                "License plate {} already registered",
                update.license_plate
            )));
        }

        let Some(car) = inventory.cars.get_mut(&id) else {
            return Ok(None);
        };
        car.brand = update.brand.clone();
        car.model = update.model.clone();
        car.license_plate = update.license_plate.clone();
        car.owner_email = update.owner_email.clone();
        car.number_of_seats = update.number_of_seats;
        car.number_of_child_seats = update.number_of_child_seats;
        car.folding_rear_seat = update.folding_rear_seat;
        car.tow_bar = update.tow_bar;
        car.available_for_rent = update.available_for_rent;
        car.updated_at = updated_at;
        Ok(Some(car.clone()))
    }

    async fn fetch_car(&self, id: Uuid) -> RepoResult<Option<Car>> {
        Ok(self.inventory.lock().await.cars.get(&id).cloned())
    }

    async fn fetch_car_by_plate(&self, plate: &LicensePlate) -> RepoResult<Option<Car>> {
        let inventory = self.inventory.lock().await;
        Ok(inventory
            .cars
            .values()
            .find(|car| &car.license_plate == plate)
            .cloned())
    }

    async fn fetch_cars(&self) -> RepoResult<Vec<Car>> {
        Ok(self.inventory.lock().await.cars_where(|_| true))
    }

    async fn fetch_available_cars(&self) -> RepoResult<Vec<Car>> {
        Ok(self
            .inventory
            .lock()
            .await
            .cars_where(|car| car.available_for_rent))
    }

    async fn fetch_cars_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Car>> {
        Ok(self
            .inventory
            .lock()
            .await
            .cars_where(|car| &car.owner_email == owner))
    }
}

#[async_trait::async_trait]
impl BookingRepo for MemoryStore {
    async fn fetch_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.inventory.lock().await.bookings.get(&id).cloned())
    }

    async fn fetch_bookings(&self) -> RepoResult<Vec<Booking>> {
        Ok(self.inventory.lock().await.bookings_where(|_| true))
    }

    async fn fetch_bookings_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| booking.car_id == car_id))
    }

    async fn fetch_bookings_by_renter(&self, renter: &EmailAddress) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| &booking.renter_email == renter))
    }

    async fn fetch_bookings_by_register_id(
        &self,
        register_id: &NationalRegisterId,
    ) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| &booking.renter.national_register_id == register_id))
    }

    async fn fetch_overlapping(&self, car_id: Uuid, range: &DateRange) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| booking.car_id == car_id && booking.period.overlaps(range)))
    }

    async fn fetch_ending_on_or_after(
        &self,
        car_id: Uuid,
        as_of: NaiveDate,
    ) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| booking.car_id == car_id && booking.period.end() >= as_of))
    }

    async fn fetch_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| booking.period.start() == day))
    }

    async fn fetch_ending_on(&self, day: NaiveDate) -> RepoResult<Vec<Booking>> {
        Ok(self
            .inventory
            .lock()
            .await
            .bookings_where(|booking| booking.period.end() == day))
    }
}

#[async_trait::async_trait]
impl RentalRepo for MemoryStore {
    #[tracing::instrument(name = "Insert rental", skip(self, new_rental))]
    async fn insert_rental(
        &self,
        new_rental: &NewRental,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Rental> {
        let mut inventory = self.inventory.lock().await;
        inventory.ensure_car(new_rental.car_id)?;

        let rental = Rental {
            id: Uuid::new_v4(),
            car_id: new_rental.car_id,
            period: new_rental.period,
            start_time: new_rental.start_time,
            end_time: new_rental.end_time,
            pickup_point: new_rental.pickup_point.clone(),
            contact: new_rental.contact.clone(),
            owner_email: new_rental.owner_email.clone(),
            created_at,
        };
        inventory.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    #[tracing::instrument(name = "Update rental", skip(self, update))]
    async fn update_rental(&self, id: Uuid, update: &NewRental) -> RepoResult<Option<Rental>> {
        let mut inventory = self.inventory.lock().await;
        if !inventory.rentals.contains_key(&id) {
            return Ok(None);
        }
        inventory.ensure_car(update.car_id)?;

        let Some(rental) = inventory.rentals.get_mut(&id) else {
            return Ok(None);
        };
        rental.car_id = update.car_id;
        rental.period = update.period;
        rental.start_time = update.start_time;
        rental.end_time = update.end_time;
        rental.pickup_point = update.pickup_point.clone();
        rental.contact = update.contact.clone();
        rental.owner_email = update.owner_email.clone();
        Ok(Some(rental.clone()))
    }

    async fn fetch_rental(&self, id: Uuid) -> RepoResult<Option<Rental>> {
        Ok(self.inventory.lock().await.rentals.get(&id).cloned())
    }

    async fn fetch_rentals(&self) -> RepoResult<Vec<Rental>> {
        Ok(self.inventory.lock().await.rentals_where(|_| true))
    }

    async fn fetch_rentals_by_car(&self, car_id: Uuid) -> RepoResult<Vec<Rental>> {
        Ok(self
            .inventory
            .lock()
            .await
            .rentals_where(|rental| rental.car_id == car_id))
    }

    async fn fetch_rentals_by_owner(&self, owner: &EmailAddress) -> RepoResult<Vec<Rental>> {
        Ok(self
            .inventory
            .lock()
            .await
            .rentals_where(|rental| &rental.owner_email == owner))
    }

    async fn fetch_rentals_starting_on(&self, day: NaiveDate) -> RepoResult<Vec<Rental>> {
        Ok(self
            .inventory
            .lock()
            .await
            .rentals_where(|rental| rental.period.start() == day))
    }

    async fn fetch_rentals_in_city(&self, city: &str) -> RepoResult<Vec<Rental>> {
        let city = city.trim().to_lowercase();
        Ok(self
            .inventory
            .lock()
            .await
            .rentals_where(|rental| rental.pickup_point.city.to_lowercase() == city))
    }

    async fn delete_rental(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.inventory.lock().await.rentals.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl NotificationRepo for MemoryStore {
    async fn insert_notification(
        &self,
        new_notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient: new_notification.recipient.clone(),
            kind: new_notification.kind,
            title: new_notification.title.clone(),
            body: new_notification.body.clone(),
            related: new_notification.related.clone(),
            status: NotificationStatus::Pending,
            created_at,
            sent_at: None,
            read_at: None,
        };
        self.notifications.lock().await.push(notification.clone());
        Ok(notification)
    }

    async fn set_delivery_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<Notification>> {
        let mut notifications = self.notifications.lock().await;
        let Some(notification) = notifications.iter_mut().find(|n| n.id == id) else {
            return Ok(None);
        };
        if !notification.is_read() {
            notification.status = status;
        }
        notification.sent_at = sent_at;
        Ok(Some(notification.clone()))
    }

    async fn fetch_notification(&self, id: Uuid) -> RepoResult<Option<Notification>> {
        let notifications = self.notifications.lock().await;
        Ok(notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn fetch_notifications_for(
        &self,
        recipient: &EmailAddress,
    ) -> RepoResult<Vec<Notification>> {
        let notifications = self.notifications.lock().await;
        Ok(newest_first(
            notifications
                .iter()
                .filter(|n| &n.recipient == recipient)
                .cloned(),
        ))
    }

    async fn fetch_unread_for(&self, recipient: &EmailAddress) -> RepoResult<Vec<Notification>> {
        let notifications = self.notifications.lock().await;
        Ok(newest_first(
            notifications
                .iter()
                .filter(|n| &n.recipient == recipient && !n.is_read())
                .cloned(),
        ))
    }

    async fn count_unread_for(&self, recipient: &EmailAddress) -> RepoResult<i64> {
        let notifications = self.notifications.lock().await;
        let count = notifications
            .iter()
            .filter(|n| &n.recipient == recipient && !n.is_read())
            .count();
        Ok(count as i64)
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> RepoResult<bool> {
        let mut notifications = self.notifications.lock().await;
        match notifications.iter_mut().find(|n| n.id == id && !n.is_read()) {
            Some(notification) => {
                notification.read_at = Some(read_at);
                notification.status = NotificationStatus::Read;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(
        &self,
        recipient: &EmailAddress,
        read_at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let mut notifications = self.notifications.lock().await;
        let mut changed = 0;
        for notification in notifications
            .iter_mut()
            .filter(|n| &n.recipient == recipient && !n.is_read())
        {
            notification.read_at = Some(read_at);
            notification.status = NotificationStatus::Read;
            changed += 1;
        }
        Ok(changed)
    }

    async fn notification_exists(
        &self,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> RepoResult<bool> {
        let notifications = self.notifications.lock().await;
        Ok(notifications.iter().any(|n| {
            n.kind == kind
                && n.related
                    .as_ref()
                    .map(|related| related.id == related_id)
                    .unwrap_or(false)
        }))
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let mut notifications = self.notifications.lock().await;
        let before = notifications.len();
        notifications.retain(|n| n.created_at >= cutoff);
        Ok((before - notifications.len()) as u64)
    }
}

/// Unit of work staging changes on a copy of the inventory
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Inventory>,
    staged: Inventory,
}

#[async_trait::async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_car(&mut self, id: Uuid) -> RepoResult<Option<Car>> {
        Ok(self.staged.cars.get(&id).cloned())
    }

    async fn overlapping_bookings(
        &mut self,
        car_id: Uuid,
        range: &DateRange,
    ) -> RepoResult<Vec<Booking>> {
        Ok(self
            .staged
            .bookings_where(|booking| booking.car_id == car_id && booking.period.overlaps(range)))
    }

    async fn insert_booking(
        &mut self,
        new_booking: &NewBooking,
        created_at: DateTime<Utc>,
    ) -> RepoResult<Booking> {
        if !self.staged.cars.contains_key(&new_booking.car_id) {
            return Err(RepoError::Conflict(format!(
                "Car {} does not exist",
                new_booking.car_id
            )));
        }
        // Mirrors the exclusion constraint of the relational schema
        let clash = self.staged.bookings.values().any(|booking| {
            booking.car_id == new_booking.car_id && booking.period.overlaps(&new_booking.period)
        });
        if clash {
            return Err(RepoError::Conflict(format!(
                "Car {} already booked during {}",
                new_booking.car_id, new_booking.period
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            car_id: new_booking.car_id,
            period: new_booking.period,
            owner_email: new_booking.owner_email.clone(),
            renter_email: new_booking.renter_email.clone(),
            renter: new_booking.renter.clone(),
            created_at,
        };
        self.staged.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn fetch_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.staged.bookings.get(&id).cloned())
    }

    async fn bookings_for_car(&mut self, car_id: Uuid) -> RepoResult<Vec<Booking>> {
        Ok(self
            .staged
            .bookings_where(|booking| booking.car_id == car_id))
    }

    async fn delete_booking(&mut self, id: Uuid) -> RepoResult<bool> {
        Ok(self.staged.bookings.remove(&id).is_some())
    }

    async fn delete_car(&mut self, id: Uuid) -> RepoResult<bool> {
        let removed = self.staged.cars.remove(&id).is_some();
        if removed {
            self.staged.bookings.retain(|_, booking| booking.car_id != id);
            self.staged.rentals.retain(|_, rental| rental.car_id != id);
        }
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        let guard = self.inventory.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}
