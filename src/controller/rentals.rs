use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::{NaiveDate, NaiveTime};

use serde::Deserialize;

use uuid::Uuid;

use crate::auth::Principal;
use crate::controller::non_empty;
use crate::domain::{EmailAddress, PhoneNumber};
use crate::error::{RegistryError, RentalError, RestError, RestResult};
use crate::model::{Contact, PickupPoint};
use crate::service::{CarRegistry, RentalCatalog, RentalRequest};

/// JSON body for publishing or replacing a rental offer
#[derive(Deserialize)]
pub struct RentalBody {
    car_id: Uuid,
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: NaiveDate,
    end_time: NaiveTime,
    street: String,
    number: String,
    postal_code: String,
    city: String,
    contact_name: String,
    phone: String,
    email: String,
}

impl TryFrom<RentalBody> for RentalRequest {
    type Error = RestError;

    fn try_from(body: RentalBody) -> RestResult<Self> {
        let pickup_point = PickupPoint {
            street: non_empty("street", body.street)?,
            number: non_empty("number", body.number)?,
            postal_code: non_empty("postal_code", body.postal_code)?,
            city: non_empty("city", body.city)?,
        };
        let contact = Contact {
            name: non_empty("contact_name", body.contact_name)?,
            phone: body
                .phone
                .parse::<PhoneNumber>()
                .map_err(RestError::ParseError)?,
            email: body
                .email
                .parse::<EmailAddress>()
                .map_err(RestError::ParseError)?,
        };

        Ok(Self {
            car_id: body.car_id,
            start: body.start_date,
            start_time: body.start_time,
            end: body.end_date,
            end_time: body.end_time,
            pickup_point,
            contact,
        })
    }
}

/// Only the owner of a car or an administrator may offer it for rent
async fn ensure_may_offer(
    principal: &Principal,
    registry: &CarRegistry,
    car_id: Uuid,
) -> RestResult<()> {
    let car = match registry.get(car_id).await {
        Ok(car) => car,
        Err(RegistryError::NotFound(_)) => return Err(RentalError::UnknownCar(car_id).into()),
        Err(e) => return Err(e.into()),
    };
    principal.require_self_or_admin(&car.owner_email)
}

#[tracing::instrument(name = "List rentals", skip(catalog))]
#[get("")]
async fn list(_principal: Principal, catalog: web::Data<RentalCatalog>) -> RestResult<impl Responder> {
    let rentals = catalog.list_all().await?;
    Ok(HttpResponse::Ok().json(rentals))
}

#[tracing::instrument(name = "Offer a car for rent", skip(body, catalog, registry))]
#[post("")]
async fn create(
    principal: Principal,
    body: web::Json<RentalBody>,
    catalog: web::Data<RentalCatalog>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let request = RentalRequest::try_from(body.into_inner())?;
    ensure_may_offer(&principal, &registry, request.car_id).await?;

    let rental = catalog.offer(request).await?;
    Ok(HttpResponse::Created().json(rental))
}

#[tracing::instrument(name = "List rentals of a car", skip(catalog))]
#[get("/car/{car_id}")]
async fn by_car(
    _principal: Principal,
    path: web::Path<(Uuid,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (car_id,) = path.into_inner();
    let rentals = catalog.list_by_car(car_id).await?;
    Ok(HttpResponse::Ok().json(rentals))
}

#[tracing::instrument(name = "List rentals of an owner", skip(catalog))]
#[get("/owner/{email}")]
async fn by_owner(
    _principal: Principal,
    path: web::Path<(String,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (email,) = path.into_inner();
    let owner: EmailAddress = email.parse().map_err(RestError::ParseError)?;

    let rentals = catalog.list_by_owner(&owner).await?;
    Ok(HttpResponse::Ok().json(rentals))
}

#[tracing::instrument(name = "List rentals starting on a day", skip(catalog))]
#[get("/date/{day}")]
async fn by_start_date(
    _principal: Principal,
    path: web::Path<(String,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (day,) = path.into_inner();
    let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
        .map_err(|_| RestError::ParseError(format!("Invalid date {}, expected yyyy-mm-dd", day)))?;

    let rentals = catalog.list_starting_on(day).await?;
    Ok(HttpResponse::Ok().json(rentals))
}

#[tracing::instrument(name = "List rentals in a city", skip(catalog))]
#[get("/city/{city}")]
async fn by_city(
    _principal: Principal,
    path: web::Path<(String,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (city,) = path.into_inner();
    let rentals = catalog.list_in_city(&city).await?;
    Ok(HttpResponse::Ok().json(rentals))
}

#[tracing::instrument(name = "Fetch a rental", skip(catalog))]
#[get("/{id}")]
async fn get_one(
    _principal: Principal,
    path: web::Path<(Uuid,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let rental = catalog.get(id).await?;
    Ok(HttpResponse::Ok().json(rental))
}

/// The caller must manage both the current offer and the car it moves to
#[tracing::instrument(name = "Update a rental", skip(body, catalog, registry))]
#[put("/{id}")]
async fn update(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    body: web::Json<RentalBody>,
    catalog: web::Data<RentalCatalog>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let current = catalog.get(id).await?;
    principal.require_self_or_admin(&current.owner_email)?;

    let request = RentalRequest::try_from(body.into_inner())?;
    ensure_may_offer(&principal, &registry, request.car_id).await?;

    let rental = catalog.update(id, request).await?;
    Ok(HttpResponse::Ok().json(rental))
}

#[tracing::instrument(name = "Withdraw a rental", skip(catalog))]
#[delete("/{id}")]
async fn remove(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    catalog: web::Data<RentalCatalog>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let current = catalog.get(id).await?;
    principal.require_self_or_admin(&current.owner_email)?;

    catalog.withdraw(id).await?;
    Ok(HttpResponse::NoContent())
}

/// Rental offer API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/rentals")
        .service(list)
        .service(create)
        .service(by_car)
        .service(by_owner)
        .service(by_start_date)
        .service(by_city)
        .service(get_one)
        .service(update)
        .service(remove)
}
