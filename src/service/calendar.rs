use std::sync::Arc;

use chrono::{Days, NaiveDate};

use uuid::Uuid;

use crate::domain::DateRange;
use crate::model::Booking;
use crate::repo::{RepoResult, Store};

/// Read-only view over the reservations of each car
#[derive(Clone)]
pub struct ReservationCalendar {
    store: Arc<dyn Store>,
}

impl ReservationCalendar {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Whether any booking of the car overlaps `range`.
    /// A booking ending on the day another starts counts as a conflict.
    #[tracing::instrument(name = "Check for conflicting bookings", skip(self))]
    pub async fn conflicts_exist(&self, car_id: Uuid, range: &DateRange) -> RepoResult<bool> {
        let bookings = self.store.fetch_overlapping(car_id, range).await?;
        Ok(first_conflict(&bookings, range).is_some())
    }

    /// Bookings of the car that have not ended before `as_of`
    #[tracing::instrument(name = "Fetch active or upcoming bookings", skip(self))]
    pub async fn active_or_upcoming(
        &self,
        car_id: Uuid,
        as_of: NaiveDate,
    ) -> RepoResult<Vec<Booking>> {
        self.store.fetch_ending_on_or_after(car_id, as_of).await
    }

    /// Free day ranges of the car inside `window`
    #[tracing::instrument(name = "Compute car availability", skip(self))]
    pub async fn availability(&self, car_id: Uuid, window: &DateRange) -> RepoResult<Vec<DateRange>> {
        let booked: Vec<DateRange> = self
            .store
            .fetch_overlapping(car_id, window)
            .await?
            .into_iter()
            .map(|booking| booking.period)
            .collect();

        Ok(free_ranges(window, &booked))
    }
}

/// First booking whose period overlaps `range`
pub fn first_conflict<'a>(bookings: &'a [Booking], range: &DateRange) -> Option<&'a Booking> {
    bookings.iter().find(|booking| booking.period.overlaps(range))
}

/// Subtract the booked ranges from `window`, yielding the remaining free ranges in order
pub fn free_ranges(window: &DateRange, booked: &[DateRange]) -> Vec<DateRange> {
    let mut taken: Vec<DateRange> = booked
        .iter()
        .filter_map(|range| range.intersect(window))
        .collect();
    taken.sort_by_key(|range| range.start());

    let mut free = Vec::new();
    // First day not yet covered, `None` once the calendar runs out of days
    let mut cursor = Some(window.start());

    for range in taken {
        let Some(from) = cursor else { break };

        if range.start() > from {
            let until = range.start().checked_sub_days(Days::new(1));
            if let Some(gap) = until.and_then(|until| DateRange::new(from, until).ok()) {
                free.push(gap);
            }
        }
        if range.end() >= from {
            cursor = range.day_after();
        }
    }

    if let Some(gap) = cursor.and_then(|from| DateRange::new(from, window.end()).ok()) {
        free.push(gap);
    }
    free
}
