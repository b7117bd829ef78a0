mod date_range;
mod email_address;
mod license_plate;
mod notification_kind;
mod renter;
mod role;

pub use date_range::*;
pub use email_address::*;
pub use license_plate::*;
pub use notification_kind::*;
pub use renter::*;
pub use role::*;
