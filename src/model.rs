mod bookings;
mod cars;
mod notifications;
mod rentals;

pub use bookings::*;
pub use cars::*;
pub use notifications::*;
pub use rentals::*;
