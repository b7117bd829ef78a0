mod bookings;
mod cars;
mod health_check;
mod helpers;
mod notifications;
mod rentals;
