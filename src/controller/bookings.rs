use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, web, HttpResponse, Responder};

use chrono::NaiveDate;

use serde::Deserialize;

use uuid::Uuid;

use crate::auth::Principal;
use crate::domain::{EmailAddress, NationalRegisterId};
use crate::error::{RestError, RestResult};
use crate::model::{Booking, RenterProfile};
use crate::service::{BookingManager, BookingRequest, CarRegistry, Clock};

/// JSON body for a new booking
#[derive(Debug, Deserialize)]
pub struct BookingBody {
    car_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    /// Only honoured for administrators, everyone else books for themselves
    renter_email: Option<String>,
    phone_number: String,
    national_register_id: String,
    birth_date: NaiveDate,
    driving_license_number: String,
}

impl BookingBody {
    fn into_request(self, principal: &Principal) -> RestResult<BookingRequest> {
        let renter_email = match self.renter_email {
            Some(email) if principal.is_admin() => {
                email.parse::<EmailAddress>().map_err(RestError::ParseError)?
            }
            _ => principal.email.clone(),
        };

        let renter = RenterProfile {
            phone_number: self.phone_number.parse().map_err(RestError::ParseError)?,
            national_register_id: self
                .national_register_id
                .parse()
                .map_err(RestError::ParseError)?,
            birth_date: self.birth_date,
            driving_license_number: self
                .driving_license_number
                .parse()
                .map_err(RestError::ParseError)?,
        };

        Ok(BookingRequest {
            car_id: self.car_id,
            start: self.start_date,
            end: self.end_date,
            renter_email,
            renter,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterIdQuery {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    as_of: Option<NaiveDate>,
}

/// Renter, car owner and administrators may see a booking
fn ensure_party(principal: &Principal, booking: &Booking) -> RestResult<()> {
    if principal.is_admin()
        || principal.email == booking.renter_email
        || principal.email == booking.owner_email
    {
        Ok(())
    } else {
        Err(RestError::Forbidden("Not a party to this booking".into()))
    }
}

#[tracing::instrument(name = "List bookings", skip(bookings))]
#[get("")]
async fn list(principal: Principal, bookings: web::Data<BookingManager>) -> RestResult<impl Responder> {
    principal.require_admin()?;

    let all = bookings.list_all().await?;
    Ok(HttpResponse::Ok().json(all))
}

#[tracing::instrument(name = "Book a car", skip(body, bookings))]
#[post("")]
async fn create(
    principal: Principal,
    body: web::Json<BookingBody>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    let request = body.into_inner().into_request(&principal)?;

    let booking = bookings.create_booking(request).await?;
    Ok(HttpResponse::Created().json(booking))
}

#[tracing::instrument(name = "List bookings of a car", skip(bookings, registry))]
#[get("/by-car/{car_id}")]
async fn by_car(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    bookings: web::Data<BookingManager>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (car_id,) = path.into_inner();
    let car = registry.get(car_id).await?;
    principal.require_self_or_admin(&car.owner_email)?;

    let found = bookings.list_by_car(car_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

#[tracing::instrument(name = "List bookings of a renter", skip(bookings))]
#[get("/renter/{email}")]
async fn by_renter(
    principal: Principal,
    path: web::Path<(String,)>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    let (email,) = path.into_inner();
    let renter: EmailAddress = email.parse().map_err(RestError::ParseError)?;
    principal.require_self_or_admin(&renter)?;

    let found = bookings.list_by_renter(&renter).await?;
    Ok(HttpResponse::Ok().json(found))
}

#[tracing::instrument(name = "List bookings by national register id", skip(bookings, query))]
#[get("/by-register-id")]
async fn by_register_id(
    principal: Principal,
    query: web::Query<RegisterIdQuery>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    principal.require_admin()?;
    let register_id: NationalRegisterId = query.id.parse().map_err(RestError::ParseError)?;

    let found = bookings.list_by_national_register_id(&register_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// Bookings carry the renter's identity documents, so only the car owner sees them.
/// Everyone else can query `/cars/{id}/availability` instead.
#[tracing::instrument(
    name = "List active or upcoming bookings of a car",
    skip(bookings, registry, clock)
)]
#[get("/active-or-upcoming/{car_id}")]
async fn active_or_upcoming(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    query: web::Query<AsOfQuery>,
    bookings: web::Data<BookingManager>,
    registry: web::Data<CarRegistry>,
    clock: web::Data<dyn Clock>,
) -> RestResult<impl Responder> {
    let (car_id,) = path.into_inner();
    let car = registry.get(car_id).await?;
    principal.require_self_or_admin(&car.owner_email)?;

    let as_of = query.as_of.unwrap_or_else(|| clock.today());

    let found = bookings.active_or_upcoming(car_id, as_of).await?;
    Ok(HttpResponse::Ok().json(found))
}

#[tracing::instrument(name = "Fetch a booking", skip(bookings))]
#[get("/{id}")]
async fn get_one(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let booking = bookings.get(id).await?;
    ensure_party(&principal, &booking)?;

    Ok(HttpResponse::Ok().json(booking))
}

#[tracing::instrument(name = "Cancel a booking", skip(bookings))]
#[delete("/{id}")]
async fn cancel(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let booking = bookings.get(id).await?;
    ensure_party(&principal, &booking)?;

    bookings.cancel_booking(id).await?;
    Ok(HttpResponse::NoContent())
}

/// Booking API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/rents")
        .service(list)
        .service(create)
        .service(by_car)
        .service(by_renter)
        .service(by_register_id)
        .service(active_or_upcoming)
        .service(get_one)
        .service(cancel)
}
