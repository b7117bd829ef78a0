use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::NaiveDate;

use serde::Deserialize;

use uuid::Uuid;

use crate::auth::Principal;
use crate::controller::non_empty;
use crate::domain::{DateRange, EmailAddress, LicensePlate, Role};
use crate::error::{RestError, RestResult};
use crate::model::{Car, NewCar};
use crate::service::{BookingManager, CarRegistry};

/// JSON body for registering or replacing a car
#[derive(Debug, Deserialize)]
pub struct CarBody {
    brand: String,
    model: String,
    license_plate: String,
    /// Only honoured for administrators, everyone else registers their own cars
    owner_email: Option<String>,
    number_of_seats: i32,
    #[serde(default)]
    number_of_child_seats: i32,
    #[serde(default)]
    folding_rear_seat: bool,
    #[serde(default)]
    tow_bar: bool,
    #[serde(default = "default_available")]
    available_for_rent: bool,
}

fn default_available() -> bool {
    true
}

impl CarBody {
    fn into_new_car(self, principal: &Principal) -> RestResult<NewCar> {
        let brand = non_empty("brand", self.brand)?;
        let model = non_empty("model", self.model)?;
        let license_plate: LicensePlate =
            self.license_plate.parse().map_err(RestError::ParseError)?;

        let owner_email = match self.owner_email {
            Some(email) if principal.is_admin() => {
                email.parse::<EmailAddress>().map_err(RestError::ParseError)?
            }
            _ => principal.email.clone(),
        };

        if self.number_of_seats < 1 {
            return Err(RestError::ParseError("A car needs at least one seat".into()));
        }
        if self.number_of_child_seats < 0 {
            return Err(RestError::ParseError(
                "Number of child seats cannot be negative".into(),
            ));
        }

        Ok(NewCar {
            brand,
            model,
            license_plate,
            owner_email,
            number_of_seats: self.number_of_seats,
            number_of_child_seats: self.number_of_child_seats,
            folding_rear_seat: self.folding_rear_seat,
            tow_bar: self.tow_bar,
            available_for_rent: self.available_for_rent,
        })
    }
}

/// Only the owner of a car or an administrator may change it
fn ensure_may_manage(principal: &Principal, car: &Car) -> RestResult<()> {
    principal.require_self_or_admin(&car.owner_email)
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    from: NaiveDate,
    to: NaiveDate,
}

#[tracing::instrument(name = "List cars", skip(registry))]
#[get("")]
async fn list(_principal: Principal, registry: web::Data<CarRegistry>) -> RestResult<impl Responder> {
    let cars = registry.list_all().await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[tracing::instrument(name = "Register a car", skip(registry))]
#[post("")]
async fn create(
    principal: Principal,
    body: web::Json<CarBody>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    if principal.role == Role::Renter {
        return Err(RestError::Forbidden("Renters cannot register cars".into()));
    }
    let new_car = body.into_inner().into_new_car(&principal)?;

    let car = registry.register(new_car).await?;
    Ok(HttpResponse::Created().json(car))
}

#[tracing::instrument(name = "List cars available for rent", skip(registry))]
#[get("/available")]
async fn available(
    _principal: Principal,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let cars = registry.list_available().await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[tracing::instrument(name = "List cars of an owner", skip(registry))]
#[get("/owner/{email}")]
async fn by_owner(
    _principal: Principal,
    path: web::Path<(String,)>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (email,) = path.into_inner();
    let owner: EmailAddress = email.parse().map_err(RestError::ParseError)?;

    let cars = registry.list_by_owner(&owner).await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[tracing::instrument(name = "Find a car by license plate", skip(registry))]
#[get("/license/{plate}")]
async fn by_license_plate(
    _principal: Principal,
    path: web::Path<(String,)>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (plate,) = path.into_inner();
    let plate: LicensePlate = plate.parse().map_err(RestError::ParseError)?;

    let car = registry
        .find_by_license_plate(&plate)
        .await?
        .ok_or_else(|| RestError::NotFound(format!("No car with license plate {}", plate)))?;
    Ok(HttpResponse::Ok().json(car))
}

#[tracing::instrument(name = "Fetch a car", skip(registry))]
#[get("/{id}")]
async fn get_one(
    _principal: Principal,
    path: web::Path<(Uuid,)>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let car = registry.get(id).await?;
    Ok(HttpResponse::Ok().json(car))
}

#[tracing::instrument(name = "Update a car", skip(registry))]
#[put("/{id}")]
async fn update(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    body: web::Json<CarBody>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let current = registry.get(id).await?;
    ensure_may_manage(&principal, &current)?;

    let mut changes = body.into_inner().into_new_car(&principal)?;
    if !principal.is_admin() {
        changes.owner_email = current.owner_email;
    }

    let car = registry.update(id, changes).await?;
    Ok(HttpResponse::Ok().json(car))
}

#[tracing::instrument(name = "Remove a car", skip(registry))]
#[delete("/{id}")]
async fn remove(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    registry: web::Data<CarRegistry>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let current = registry.get(id).await?;
    ensure_may_manage(&principal, &current)?;

    registry.remove(id).await?;
    Ok(HttpResponse::NoContent())
}

#[tracing::instrument(name = "Fetch car availability", skip(bookings))]
#[get("/{id}/availability")]
async fn availability(
    _principal: Principal,
    path: web::Path<(Uuid,)>,
    query: web::Query<AvailabilityQuery>,
    bookings: web::Data<BookingManager>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let window = DateRange::new(query.from, query.to)
        .map_err(|e| RestError::ParseError(e.to_string()))?;

    let free = bookings.availability(id, &window).await?;
    Ok(HttpResponse::Ok().json(free))
}

/// Car API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/cars")
        .service(list)
        .service(create)
        .service(available)
        .service(by_owner)
        .service(by_license_plate)
        .service(availability)
        .service(get_one)
        .service(update)
        .service(remove)
}
