use chrono::{DateTime, NaiveDate, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{DateRange, EmailAddress, NationalRegisterId};
use crate::model::{Booking, NewBooking, RenterProfile};
use crate::repo::{RepoError, RepoResult};

use super::{convert_all, parse_column};

macro_rules! booking_columns {
    () => {
        "id, car_id, start_date, end_date, owner_email, renter_email, phone_number, \
         national_register_id, birth_date, driving_license_number, created_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    car_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    owner_email: String,
    renter_email: String,
    phone_number: String,
    national_register_id: String,
    birth_date: NaiveDate,
    driving_license_number: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepoError;

    fn try_from(row: BookingRow) -> RepoResult<Self> {
        let renter = RenterProfile {
            phone_number: parse_column("phone_number", row.phone_number.parse())?,
            national_register_id: parse_column(
                "national_register_id",
                row.national_register_id.parse(),
            )?,
            birth_date: row.birth_date,
            driving_license_number: parse_column(
                "driving_license_number",
                row.driving_license_number.parse(),
            )?,
        };

        Ok(Self {
            id: row.id,
            car_id: row.car_id,
            period: parse_column("start_date", DateRange::new(row.start_date, row.end_date))?,
            owner_email: parse_column("owner_email", row.owner_email.parse())?,
            renter_email: parse_column("renter_email", row.renter_email.parse())?,
            renter,
            created_at: row.created_at,
        })
    }
}

/// Insert a booking. Overlapping periods are rejected by the exclusion constraint
#[tracing::instrument(name = "Insert booking", skip(executor))]
pub(super) async fn insert<'con>(
    executor: impl PgExecutor<'con>,
    new_booking: &NewBooking,
    created_at: DateTime<Utc>,
) -> RepoResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(concat!(
        "insert into bookings(id, car_id, start_date, end_date, owner_email, renter_email, \
         phone_number, national_register_id, birth_date, driving_license_number, created_at) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) returning ",
        booking_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(new_booking.car_id)
    .bind(new_booking.period.start())
    .bind(new_booking.period.end())
    .bind(new_booking.owner_email.as_ref())
    .bind(new_booking.renter_email.as_ref())
    .bind(new_booking.renter.phone_number.as_ref())
    .bind(new_booking.renter.national_register_id.as_ref())
    .bind(new_booking.renter.birth_date)
    .bind(new_booking.renter.driving_license_number.as_ref())
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

/// Fetch a booking by id, optionally locking the row until the end of the transaction
#[tracing::instrument(name = "Fetch booking by id", skip(executor))]
pub(super) async fn fetch_by_id<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
    for_update: bool,
) -> RepoResult<Option<Booking>> {
    let query = if for_update {
        concat!("select ", booking_columns!(), " from bookings where id=$1 for update")
    } else {
        concat!("select ", booking_columns!(), " from bookings where id=$1")
    };

    sqlx::query_as::<_, BookingRow>(query)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(TryInto::try_into)
        .transpose()
}

#[tracing::instrument(name = "Fetch all bookings", skip(executor))]
pub(super) async fn fetch_all<'con>(executor: impl PgExecutor<'con>) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings order by start_date, id"
    ))
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch bookings by car", skip(executor))]
pub(super) async fn fetch_by_car<'con>(
    executor: impl PgExecutor<'con>,
    car_id: Uuid,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where car_id=$1 order by start_date, id"
    ))
    .bind(car_id)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch bookings by renter", skip(executor))]
pub(super) async fn fetch_by_renter<'con>(
    executor: impl PgExecutor<'con>,
    renter: &EmailAddress,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where renter_email=$1 order by start_date, id"
    ))
    .bind(renter.as_ref())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch bookings by national register id", skip(executor))]
pub(super) async fn fetch_by_register_id<'con>(
    executor: impl PgExecutor<'con>,
    register_id: &NationalRegisterId,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where national_register_id=$1 order by start_date, id"
    ))
    .bind(register_id.as_ref())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

/// Closed-interval overlap: `start <= range.end and end >= range.start`
#[tracing::instrument(name = "Fetch overlapping bookings", skip(executor))]
pub(super) async fn fetch_overlapping<'con>(
    executor: impl PgExecutor<'con>,
    car_id: Uuid,
    range: &DateRange,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where car_id=$1 and start_date <= $3 and end_date >= $2 \
         order by start_date, id"
    ))
    .bind(car_id)
    .bind(range.start())
    .bind(range.end())
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch active or upcoming bookings", skip(executor))]
pub(super) async fn fetch_ending_on_or_after<'con>(
    executor: impl PgExecutor<'con>,
    car_id: Uuid,
    as_of: NaiveDate,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where car_id=$1 and end_date >= $2 order by start_date, id"
    ))
    .bind(car_id)
    .bind(as_of)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch bookings starting on day", skip(executor))]
pub(super) async fn fetch_starting_on<'con>(
    executor: impl PgExecutor<'con>,
    day: NaiveDate,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where start_date=$1 order by start_date, id"
    ))
    .bind(day)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Fetch bookings ending on day", skip(executor))]
pub(super) async fn fetch_ending_on<'con>(
    executor: impl PgExecutor<'con>,
    day: NaiveDate,
) -> RepoResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>(concat!(
        "select ",
        booking_columns!(),
        " from bookings where end_date=$1 order by start_date, id"
    ))
    .bind(day)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Delete booking", skip(executor))]
pub(super) async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> RepoResult<bool> {
    let result = sqlx::query("delete from bookings where id=$1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
