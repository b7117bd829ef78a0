use crate::error::{RestError, RestResult};

pub mod admin;
pub mod bookings;
pub mod cars;
pub mod notifications;
pub mod rentals;

/// Trim a required text field, rejecting blank values
pub(crate) fn non_empty(field: &str, value: String) -> RestResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(RestError::ParseError(format!("{} cannot be empty", field)));
    }
    Ok(value)
}
