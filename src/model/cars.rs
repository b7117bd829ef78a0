use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{EmailAddress, LicensePlate};

/// New car registration, also used as the full replacement on update
#[derive(Debug, Clone)]
pub struct NewCar {
    pub brand: String,
    pub model: String,
    pub license_plate: LicensePlate,
    pub owner_email: EmailAddress,
    pub number_of_seats: i32,
    pub number_of_child_seats: i32,
    pub folding_rear_seat: bool,
    pub tow_bar: bool,
    pub available_for_rent: bool,
}

/// Stored car record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Car {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub license_plate: LicensePlate,
    pub owner_email: EmailAddress,
    pub number_of_seats: i32,
    pub number_of_child_seats: i32,
    pub folding_rear_seat: bool,
    pub tow_bar: bool,
    pub available_for_rent: bool,
    /// Creation and update timestamps
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Car {
    /// "Brand Model", as shown to users
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}
