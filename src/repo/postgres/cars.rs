use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{EmailAddress, LicensePlate};
use crate::model::{Car, NewCar};
use crate::repo::{RepoError, RepoResult};

use super::{convert_all, parse_column};

macro_rules! car_columns {
    () => {
        "id, brand, model, license_plate, owner_email, number_of_seats, number_of_child_seats, \
         folding_rear_seat, tow_bar, available_for_rent, created_at, updated_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    brand: String,
    model: String,
    license_plate: String,
    owner_email: String,
    number_of_seats: i32,
    number_of_child_seats: i32,
    folding_rear_seat: bool,
    tow_bar: bool,
    available_for_rent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CarRow> for Car {
    type Error = RepoError;

    fn try_from(row: CarRow) -> RepoResult<Self> {
        Ok(Self {
            id: row.id,
            brand: row.brand,
            model: row.model,
            license_plate: parse_column("license_plate", row.license_plate.parse())?,
            owner_email: parse_column("owner_email", row.owner_email.parse())?,
            number_of_seats: row.number_of_seats,
            number_of_child_seats: row.number_of_child_seats,
            folding_rear_seat: row.folding_rear_seat,
            tow_bar: row.tow_bar,
            available_for_rent: row.available_for_rent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[tracing::instrument(name = "Insert car", skip(executor))]
pub(super) async fn insert<'con>(
    executor: impl PgExecutor<'con>,
    new_car: &NewCar,
    created_at: DateTime<Utc>,
) -> RepoResult<Car> {
    let row = sqlx::query_as::<_, CarRow>(concat!(
        "insert into cars(id, brand, model, license_plate, owner_email, number_of_seats, \
         number_of_child_seats, folding_rear_seat, tow_bar, available_for_rent, created_at, \
         updated_at) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) returning ",
        car_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(&new_car.brand)
    .bind(&new_car.model)
    .bind(new_car.license_plate.as_ref())
    .bind(new_car.owner_email.as_ref())
    .bind(new_car.number_of_seats)
    .bind(new_car.number_of_child_seats)
    .bind(new_car.folding_rear_seat)
    .bind(new_car.tow_bar)
    .bind(new_car.available_for_rent)
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[tracing::instrument(name = "Update car", skip(executor))]
pub(super) async fn update<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
    car: &NewCar,
    updated_at: DateTime<Utc>,
) -> RepoResult<Option<Car>> {
    let row = sqlx::query_as::<_, CarRow>(concat!(
        "update cars set brand=$2, model=$3, license_plate=$4, owner_email=$5, \
         number_of_seats=$6, number_of_child_seats=$7, folding_rear_seat=$8, tow_bar=$9, \
         available_for_rent=$10, updated_at=$11 where id=$1 returning ",
        car_columns!()
    ))
    .bind(id)
    .bind(&car.brand)
    .bind(&car.model)
    .bind(car.license_plate.as_ref())
    .bind(car.owner_email.as_ref())
    .bind(car.number_of_seats)
    .bind(car.number_of_child_seats)
    .bind(car.folding_rear_seat)
    .bind(car.tow_bar)
    .bind(car.available_for_rent)
    .bind(updated_at)
    .fetch_optional(executor)
    .await?;

    row.map(TryInto::try_into).transpose()
}

#[tracing::instrument(name = "Fetch car by id", skip(executor))]
pub(super) async fn fetch_by_id<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
) -> RepoResult<Option<Car>> {
    sqlx::query_as::<_, CarRow>(concat!("select ", car_columns!(), " from cars where id=$1"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(TryInto::try_into)
        .transpose()
}

/// Fetch a car and lock its row until the end of the transaction
#[tracing::instrument(name = "Lock car by id", skip(executor))]
pub(super) async fn lock_by_id<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
) -> RepoResult<Option<Car>> {
    sqlx::query_as::<_, CarRow>(concat!(
        "select ",
        car_columns!(),
        " from cars where id=$1 for update"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .map(TryInto::try_into)
    .transpose()
}

#[tracing::instrument(name = "Fetch car by license plate", skip(executor))]
pub(super) async fn fetch_by_plate<'con>(
    executor: impl PgExecutor<'con>,
    plate: &LicensePlate,
) -> RepoResult<Option<Car>> {
    sqlx::query_as::<_, CarRow>(concat!(
        "select ",
        car_columns!(),
        " from cars where license_plate=$1"
    ))
    .bind(plate.as_ref())
    .fetch_optional(executor)
    .await?
    .map(TryInto::try_into)
    .transpose()
}

#[tracing::instrument(name = "Fetch all cars", skip(executor))]
pub(super) async fn fetch_all<'con>(executor: impl PgExecutor<'con>) -> RepoResult<Vec<Car>> {
    let rows = sqlx::query_as::<_, CarRow>(concat!(
        "select ",
        car_columns!(),
        " from cars order by created_at, id"
    ))
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch available cars", skip(executor))]
pub(super) async fn fetch_available<'con>(
    executor: impl PgExecutor<'con>,
) -> RepoResult<Vec<Car>> {
    let rows = sqlx::query_as::<_, CarRow>(concat!(
        "select ",
        car_columns!(),
        " from cars where available_for_rent order by created_at, id"
    ))
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch cars by owner", skip(executor))]
pub(super) async fn fetch_by_owner<'con>(
    executor: impl PgExecutor<'con>,
    owner: &EmailAddress,
) -> RepoResult<Vec<Car>> {
    let rows = sqlx::query_as::<_, CarRow>(concat!(
        "select ",
        car_columns!(),
        " from cars where owner_email=$1 order by created_at, id"
    ))
    .bind(owner.as_ref())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Delete car", skip(executor))]
pub(super) async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> RepoResult<bool> {
    let result = sqlx::query("delete from cars where id=$1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
