use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use chrono::NaiveDateTime;

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{DateRange, InvalidRange, LicensePlate};
use crate::repo::RepoError;

/// Rejections returned by the booking lifecycle
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Car {0} does not exist")]
    CarNotFound(Uuid),
    #[error("Booking {0} does not exist")]
    BookingNotFound(Uuid),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error("Car {car_id} is already booked during {period}")]
    AlreadyBooked { car_id: Uuid, period: DateRange },
    #[error("Car {0} is not available for rent")]
    CarUnavailable(Uuid),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl BookingError {
    /// Whether the rejection is caused by a missing car or booking
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CarNotFound(_) | Self::BookingNotFound(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Car {0} does not exist")]
    NotFound(Uuid),
    #[error("License plate {0} is already registered")]
    DuplicatePlate(LicensePlate),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Rejections returned by the rental catalog
#[derive(Debug, thiserror::Error)]
pub enum RentalError {
    #[error("Rental {0} does not exist")]
    NotFound(Uuid),
    /// The offer names a car that is not registered
    #[error("Car {0} does not exist")]
    UnknownCar(Uuid),
    #[error("Rental must end after it starts, got {start} until {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification {0} does not exist")]
    NotFound(Uuid),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type RestResult<T> = Result<T, RestError>;

/// Errors returned by REST endpoints
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to authenticate")]
    FailedToAuthenticate(#[source] anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl From<RepoError> for RestError {
    fn from(e: RepoError) -> Self {
        tracing::error!(error.cause_chain = ?e, "Storage failure");
        Self::InternalError("Database error".into())
    }
}

impl From<BookingError> for RestError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::CarNotFound(_) | BookingError::BookingNotFound(_) => {
                Self::NotFound(e.to_string())
            }
            BookingError::InvalidRange(_) => Self::ParseError(e.to_string()),
            BookingError::AlreadyBooked { .. } | BookingError::CarUnavailable(_) => {
                Self::Conflict(e.to_string())
            }
            BookingError::Repo(e) => e.into(),
        }
    }
}

impl From<RegistryError> for RestError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(_) => Self::NotFound(e.to_string()),
            RegistryError::DuplicatePlate(_) => Self::Conflict(e.to_string()),
            RegistryError::Repo(e) => e.into(),
        }
    }
}

impl From<RentalError> for RestError {
    fn from(e: RentalError) -> Self {
        match e {
            RentalError::NotFound(_) => Self::NotFound(e.to_string()),
            RentalError::UnknownCar(_)
            | RentalError::InvalidWindow { .. }
            | RentalError::InvalidRange(_) => Self::ParseError(e.to_string()),
            RentalError::Repo(e) => e.into(),
        }
    }
}

impl From<NotificationError> for RestError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::NotFound(_) => Self::NotFound(e.to_string()),
            NotificationError::Repo(e) => e.into(),
        }
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::FailedToAuthenticate(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::FailedToAuthenticate(e) = self {
            tracing::info!(error.cause_chain = ?e, "Rejected request credentials");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}
