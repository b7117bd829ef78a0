use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{DateRange, EmailAddress};
use crate::model::{Contact, NewRental, PickupPoint, Rental};
use crate::repo::{RepoError, RepoResult};

use super::{convert_all, parse_column};

macro_rules! rental_columns {
    () => {
        "id, car_id, start_date, start_time, end_date, end_time, street, house_number, \
         postal_code, city, contact_name, contact_phone, contact_email, owner_email, created_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct RentalRow {
    id: Uuid,
    car_id: Uuid,
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: NaiveDate,
    end_time: NaiveTime,
    street: String,
    house_number: String,
    postal_code: String,
    city: String,
    contact_name: String,
    contact_phone: String,
    contact_email: String,
    owner_email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RentalRow> for Rental {
    type Error = RepoError;

    fn try_from(row: RentalRow) -> RepoResult<Self> {
        Ok(Self {
            id: row.id,
            car_id: row.car_id,
            period: parse_column("start_date", DateRange::new(row.start_date, row.end_date))?,
            start_time: row.start_time,
            end_time: row.end_time,
            pickup_point: PickupPoint {
                street: row.street,
                number: row.house_number,
                postal_code: row.postal_code,
                city: row.city,
            },
            contact: Contact {
                name: row.contact_name,
                phone: parse_column("contact_phone", row.contact_phone.parse())?,
                email: parse_column("contact_email", row.contact_email.parse())?,
            },
            owner_email: parse_column("owner_email", row.owner_email.parse())?,
            created_at: row.created_at,
        })
    }
}

/// Insert a rental offer. A missing car is rejected by the foreign key
#[tracing::instrument(name = "Insert rental", skip(executor, new_rental))]
pub(super) async fn insert<'con>(
    executor: impl PgExecutor<'con>,
    new_rental: &NewRental,
    created_at: DateTime<Utc>,
) -> RepoResult<Rental> {
    let row = sqlx::query_as::<_, RentalRow>(concat!(
        "insert into rentals(id, car_id, start_date, start_time, end_date, end_time, street, \
         house_number, postal_code, city, contact_name, contact_phone, contact_email, \
         owner_email, created_at) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) returning ",
        rental_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(new_rental.car_id)
    .bind(new_rental.period.start())
    .bind(new_rental.start_time)
    .bind(new_rental.period.end())
    .bind(new_rental.end_time)
    .bind(&new_rental.pickup_point.street)
    .bind(&new_rental.pickup_point.number)
    .bind(&new_rental.pickup_point.postal_code)
    .bind(&new_rental.pickup_point.city)
    .bind(&new_rental.contact.name)
    .bind(new_rental.contact.phone.as_ref())
    .bind(new_rental.contact.email.as_ref())
    .bind(new_rental.owner_email.as_ref())
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[tracing::instrument(name = "Update rental", skip(executor, rental))]
pub(super) async fn update<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
    rental: &NewRental,
) -> RepoResult<Option<Rental>> {
    let row = sqlx::query_as::<_, RentalRow>(concat!(
        "update rentals set car_id=$2, start_date=$3, start_time=$4, end_date=$5, end_time=$6, \
         street=$7, house_number=$8, postal_code=$9, city=$10, contact_name=$11, \
         contact_phone=$12, contact_email=$13, owner_email=$14 where id=$1 returning ",
        rental_columns!()
    ))
    .bind(id)
    .bind(rental.car_id)
    .bind(rental.period.start())
    .bind(rental.start_time)
    .bind(rental.period.end())
    .bind(rental.end_time)
    .bind(&rental.pickup_point.street)
    .bind(&rental.pickup_point.number)
    .bind(&rental.pickup_point.postal_code)
    .bind(&rental.pickup_point.city)
    .bind(&rental.contact.name)
    .bind(rental.contact.phone.as_ref())
    .bind(rental.contact.email.as_ref())
    .bind(rental.owner_email.as_ref())
    .fetch_optional(executor)
    .await?;

    row.map(TryInto::try_into).transpose()
}

#[tracing::instrument(name = "Fetch rental by id", skip(executor))]
pub(super) async fn fetch_by_id<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
) -> RepoResult<Option<Rental>> {
    sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals where id=$1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .map(TryInto::try_into)
    .transpose()
}

#[tracing::instrument(name = "Fetch all rentals", skip(executor))]
pub(super) async fn fetch_all<'con>(executor: impl PgExecutor<'con>) -> RepoResult<Vec<Rental>> {
    let rows = sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals order by start_date, start_time, id"
    ))
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch rentals by car", skip(executor))]
pub(super) async fn fetch_by_car<'con>(
    executor: impl PgExecutor<'con>,
    car_id: Uuid,
) -> RepoResult<Vec<Rental>> {
    let rows = sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals where car_id=$1 order by start_date, start_time, id"
    ))
    .bind(car_id)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch rentals by owner", skip(executor))]
pub(super) async fn fetch_by_owner<'con>(
    executor: impl PgExecutor<'con>,
    owner: &EmailAddress,
) -> RepoResult<Vec<Rental>> {
    let rows = sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals where owner_email=$1 order by start_date, start_time, id"
    ))
    .bind(owner.as_ref())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch rentals starting on a day", skip(executor))]
pub(super) async fn fetch_starting_on<'con>(
    executor: impl PgExecutor<'con>,
    day: NaiveDate,
) -> RepoResult<Vec<Rental>> {
    let rows = sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals where start_date=$1 order by start_date, start_time, id"
    ))
    .bind(day)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch rentals in a city", skip(executor))]
pub(super) async fn fetch_in_city<'con>(
    executor: impl PgExecutor<'con>,
    city: &str,
) -> RepoResult<Vec<Rental>> {
    let rows = sqlx::query_as::<_, RentalRow>(concat!(
        "select ",
        rental_columns!(),
        " from rentals where lower(city)=lower($1) order by start_date, start_time, id"
    ))
    .bind(city.trim())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Delete rental", skip(executor))]
pub(super) async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> RepoResult<bool> {
    let result = sqlx::query("delete from rentals where id=$1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
