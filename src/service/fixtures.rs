//! Shared builders for service tests.

use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::client::{DeliveryChannel, DeliveryError, Email};
use crate::domain::EmailAddress;
use crate::model::{Booking, Car, NewBooking, NewCar, RenterProfile};
use crate::repo::{CarRepo, MemoryStore, Store};
use crate::service::{Clock, FixedClock};

pub const OWNER: &str = "owner@cars.be";
pub const RENTER: &str = "renter@cars.be";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn email(value: &str) -> EmailAddress {
    value.parse().unwrap()
}

pub fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

pub fn new_car(plate: &str) -> NewCar {
    NewCar {
        brand: "Volkswagen".into(),
        model: "Golf".into(),
        license_plate: plate.parse().unwrap(),
        owner_email: email(OWNER),
        number_of_seats: 5,
        number_of_child_seats: 1,
        folding_rear_seat: true,
        tow_bar: false,
        available_for_rent: true,
    }
}

pub fn renter_profile() -> RenterProfile {
    RenterProfile {
        phone_number: "+32 470 12 34 56".parse().unwrap(),
        national_register_id: "90.02.01-997.04".parse().unwrap(),
        birth_date: day(1990, 2, 1),
        driving_license_number: "1234567890".parse().unwrap(),
    }
}

pub async fn seed_car(store: &MemoryStore, plate: &str) -> Car {
    store.insert_car(&new_car(plate), clock().now()).await.unwrap()
}

/// Insert a booking directly, bypassing the lifecycle
pub async fn seed_booking(store: &MemoryStore, car: &Car, start: NaiveDate, end: NaiveDate) -> Booking {
    let mut uow = store.begin().await.unwrap();
    let booking = uow
        .insert_booking(
            &NewBooking {
                car_id: car.id,
                period: crate::domain::DateRange::new(start, end).unwrap(),
                owner_email: car.owner_email.clone(),
                renter_email: email(RENTER),
                renter: renter_profile(),
            },
            clock().now(),
        )
        .await
        .unwrap();
    uow.commit().await.unwrap();
    booking
}

/// Delivery channel recording every message, optionally failing all of them
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub failing: bool,
    pub sent: Mutex<Vec<(EmailAddress, Email)>>,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<Email> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to.as_ref() == recipient)
            .map(|(_, email)| email.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn deliver(&self, recipient: &EmailAddress, email: &Email) -> Result<(), DeliveryError> {
        if self.failing {
            return Err(DeliveryError::Rejected("mail server unavailable".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), email.clone()));
        Ok(())
    }
}
