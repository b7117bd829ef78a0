use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{DateRange, EmailAddress, PhoneNumber};

/// Address where the renter collects the car
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickupPoint {
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub city: String,
}

/// Person to reach about a rental offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: String,
    pub phone: PhoneNumber,
    pub email: EmailAddress,
}

/// New rental offer, also used as the full replacement on update.
/// The owner is always the owner of `car_id`.
#[derive(Debug, Clone)]
pub struct NewRental {
    pub car_id: Uuid,
    pub period: DateRange,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub pickup_point: PickupPoint,
    pub contact: Contact,
    pub owner_email: EmailAddress,
}

/// Stored rental offer: a window during which an owner puts a car up for rent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rental {
    pub id: Uuid,
    pub car_id: Uuid,
    #[serde(flatten)]
    pub period: DateRange,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub pickup_point: PickupPoint,
    pub contact: Contact,
    pub owner_email: EmailAddress,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.period.start().and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.period.end().and_time(self.end_time)
    }
}
