use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{
    DateRange, DrivingLicenseNumber, EmailAddress, NationalRegisterId, PhoneNumber,
};

/// Entity type recorded on notifications that refer to a booking
pub const BOOKING_ENTITY_TYPE: &str = "RENT";

/// Personal details a renter supplies with every booking.
/// Only serialized in responses, debug output hides all of it.
#[derive(Clone, PartialEq, Serialize)]
pub struct RenterProfile {
    pub phone_number: PhoneNumber,
    pub national_register_id: NationalRegisterId,
    pub birth_date: NaiveDate,
    pub driving_license_number: DrivingLicenseNumber,
}

impl fmt::Debug for RenterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenterProfile([REDACTED])")
    }
}

/// Booking ready to be inserted. The period has already been validated
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub car_id: Uuid,
    pub period: DateRange,
    /// Copied from the car at booking time
    pub owner_email: EmailAddress,
    pub renter_email: EmailAddress,
    pub renter: RenterProfile,
}

/// Stored booking record, always in the confirmed state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub car_id: Uuid,
    #[serde(flatten)]
    pub period: DateRange,
    pub owner_email: EmailAddress,
    pub renter_email: EmailAddress,
    pub renter: RenterProfile,
    pub created_at: DateTime<Utc>,
}
