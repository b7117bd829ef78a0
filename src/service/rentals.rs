use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use uuid::Uuid;

use crate::domain::{DateRange, EmailAddress};
use crate::error::RentalError;
use crate::model::{Contact, NewRental, PickupPoint, Rental};
use crate::repo::{RepoError, Store};
use crate::service::Clock;

/// Window during which a car is put up for rent, with where to collect it
#[derive(Debug, Clone)]
pub struct RentalRequest {
    pub car_id: Uuid,
    pub start: NaiveDate,
    pub start_time: NaiveTime,
    pub end: NaiveDate,
    pub end_time: NaiveTime,
    pub pickup_point: PickupPoint,
    pub contact: Contact,
}

/// Rental offers published by car owners
#[derive(Clone)]
pub struct RentalCatalog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl RentalCatalog {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Publish an offer. The owner of the offer is the owner of the car.
    #[tracing::instrument(name = "Offer a car for rent", skip(self, request), fields(car_id = %request.car_id))]
    pub async fn offer(&self, request: RentalRequest) -> Result<Rental, RentalError> {
        let new_rental = self.prepare(request).await?;

        let rental = self
            .store
            .insert_rental(&new_rental, self.clock.now())
            .await
            .map_err(|e| missing_car(e, new_rental.car_id))?;
        tracing::info!("Rental {} offered for car {}", rental.id, rental.car_id);
        Ok(rental)
    }

    /// Replace every field of an offer, possibly moving it to another car
    #[tracing::instrument(name = "Update a rental", skip(self, request))]
    pub async fn update(&self, id: Uuid, request: RentalRequest) -> Result<Rental, RentalError> {
        let rental = self.prepare(request).await?;

        self.store
            .update_rental(id, &rental)
            .await
            .map_err(|e| missing_car(e, rental.car_id))?
            .ok_or(RentalError::NotFound(id))
    }

    #[tracing::instrument(name = "Fetch a rental", skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Rental, RentalError> {
        self.store
            .fetch_rental(id)
            .await?
            .ok_or(RentalError::NotFound(id))
    }

    #[tracing::instrument(name = "Fetch all rentals", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Rental>, RentalError> {
        Ok(self.store.fetch_rentals().await?)
    }

    /// Empty for a car without offers, registered or not
    #[tracing::instrument(name = "Fetch rentals of a car", skip(self))]
    pub async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Rental>, RentalError> {
        Ok(self.store.fetch_rentals_by_car(car_id).await?)
    }

    #[tracing::instrument(name = "Fetch rentals of an owner", skip(self))]
    pub async fn list_by_owner(&self, owner: &EmailAddress) -> Result<Vec<Rental>, RentalError> {
        Ok(self.store.fetch_rentals_by_owner(owner).await?)
    }

    #[tracing::instrument(name = "Fetch rentals starting on a day", skip(self))]
    pub async fn list_starting_on(&self, day: NaiveDate) -> Result<Vec<Rental>, RentalError> {
        Ok(self.store.fetch_rentals_starting_on(day).await?)
    }

    #[tracing::instrument(name = "Fetch rentals in a city", skip(self))]
    pub async fn list_in_city(&self, city: &str) -> Result<Vec<Rental>, RentalError> {
        Ok(self.store.fetch_rentals_in_city(city).await?)
    }

    #[tracing::instrument(name = "Withdraw a rental", skip(self))]
    pub async fn withdraw(&self, id: Uuid) -> Result<(), RentalError> {
        if !self.store.delete_rental(id).await? {
            return Err(RentalError::NotFound(id));
        }
        tracing::info!("Rental {} withdrawn", id);
        Ok(())
    }

    async fn prepare(&self, request: RentalRequest) -> Result<NewRental, RentalError> {
        let period = DateRange::new(request.start, request.end)?;
        let start = request.start.and_time(request.start_time);
        let end = request.end.and_time(request.end_time);
        if start >= end {
            return Err(RentalError::InvalidWindow { start, end });
        }

        let car = self
            .store
            .fetch_car(request.car_id)
            .await?
            .ok_or(RentalError::UnknownCar(request.car_id))?;

        Ok(NewRental {
            car_id: car.id,
            period,
            start_time: request.start_time,
            end_time: request.end_time,
            pickup_point: request.pickup_point,
            contact: request.contact,
            owner_email: car.owner_email,
        })
    }
}

// The car was removed between the lookup and the write
fn missing_car(e: RepoError, car_id: Uuid) -> RentalError {
    match e {
        RepoError::Conflict(_) => RentalError::UnknownCar(car_id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_matches, assert_ok};

    use super::*;
    use crate::repo::{CarRepo, MemoryStore};
    use crate::service::fixtures::*;

    fn catalog(store: &MemoryStore) -> RentalCatalog {
        RentalCatalog::new(Arc::new(store.clone()), Arc::new(clock()))
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn request(car_id: Uuid, start: NaiveDate, end: NaiveDate, city: &str) -> RentalRequest {
        RentalRequest {
            car_id,
            start,
            start_time: at(9),
            end,
            end_time: at(18),
            pickup_point: PickupPoint {
                street: "Naamsestraat".into(),
                number: "22".into(),
                postal_code: "3000".into(),
                city: city.into(),
            },
            contact: Contact {
                name: "Olivia Owner".into(),
                phone: "+32 470 00 00 00".parse().unwrap(),
                email: email(OWNER),
            },
        }
    }

    #[tokio::test]
    async fn offers_belong_to_the_car_owner() {
        let store = MemoryStore::new();
        let car = seed_car(&store, "1-ABC-123").await;

        let rental = assert_ok!(
            catalog(&store)
                .offer(request(car.id, day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
                .await
        );

        assert_eq!(rental.owner_email, car.owner_email);
        assert_eq!(rental.created_at, clock().now());
        assert_eq!(assert_ok!(catalog(&store).get(rental.id).await), rental);
    }

    #[tokio::test]
    async fn offers_for_unknown_cars_are_rejected() {
        let store = MemoryStore::new();

        let res = catalog(&store)
            .offer(request(Uuid::new_v4(), day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
            .await;

        assert_matches!(res, Err(RentalError::UnknownCar(_)));
    }

    #[tokio::test]
    async fn a_rental_must_end_after_it_starts() {
        let store = MemoryStore::new();
        let car = seed_car(&store, "1-ABC-123").await;
        let catalog = catalog(&store);

        let mut same_day = request(car.id, day(2024, 6, 1), day(2024, 6, 1), "Leuven");
        same_day.start_time = at(18);
        same_day.end_time = at(9);
        assert_matches!(
            catalog.offer(same_day).await,
            Err(RentalError::InvalidWindow { .. })
        );

        let backwards = request(car.id, day(2024, 6, 3), day(2024, 6, 1), "Leuven");
        assert_matches!(
            catalog.offer(backwards).await,
            Err(RentalError::InvalidRange(_))
        );

        // An earlier clock time is fine once the dates differ
        let mut overnight = request(car.id, day(2024, 6, 1), day(2024, 6, 2), "Leuven");
        overnight.start_time = at(20);
        overnight.end_time = at(8);
        assert_ok!(catalog.offer(overnight).await);
    }

    #[tokio::test]
    async fn rentals_can_be_filtered() {
        let store = MemoryStore::new();
        let car = seed_car(&store, "1-ABC-123").await;
        let catalog = catalog(&store);
        let leuven = catalog
            .offer(request(car.id, day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
            .await
            .unwrap();
        let gent = catalog
            .offer(request(car.id, day(2024, 6, 10), day(2024, 6, 12), "Gent"))
            .await
            .unwrap();

        assert_eq!(catalog.list_all().await.unwrap(), vec![leuven.clone(), gent.clone()]);
        assert_eq!(catalog.list_in_city("leuven").await.unwrap(), vec![leuven.clone()]);
        assert_eq!(
            catalog.list_starting_on(day(2024, 6, 10)).await.unwrap(),
            vec![gent.clone()]
        );
        assert_eq!(
            catalog.list_by_owner(&email(OWNER)).await.unwrap(),
            vec![leuven.clone(), gent]
        );
        assert!(catalog.list_by_owner(&email(RENTER)).await.unwrap().is_empty());
        assert!(catalog.list_by_car(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn moving_an_offer_to_another_car_follows_its_owner() {
        let store = MemoryStore::new();
        let car = seed_car(&store, "1-ABC-123").await;
        let mut other = new_car("2-XYZ-987");
        other.owner_email = email("other@cars.be");
        let other = store.insert_car(&other, clock().now()).await.unwrap();
        let catalog = catalog(&store);
        let rental = catalog
            .offer(request(car.id, day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
            .await
            .unwrap();

        let moved = assert_ok!(
            catalog
                .update(rental.id, request(other.id, day(2024, 6, 1), day(2024, 6, 3), "Gent"))
                .await
        );

        assert_eq!(moved.id, rental.id);
        assert_eq!(moved.car_id, other.id);
        assert_eq!(moved.owner_email, other.owner_email);
        assert_eq!(moved.pickup_point.city, "Gent");
        assert_eq!(moved.created_at, rental.created_at);
    }

    #[tokio::test]
    async fn missing_rentals_are_not_found() {
        let store = MemoryStore::new();
        let car = seed_car(&store, "1-ABC-123").await;
        let catalog = catalog(&store);
        let rental = catalog
            .offer(request(car.id, day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
            .await
            .unwrap();

        assert_ok!(catalog.withdraw(rental.id).await);

        assert_matches!(catalog.get(rental.id).await, Err(RentalError::NotFound(_)));
        assert_matches!(catalog.withdraw(rental.id).await, Err(RentalError::NotFound(_)));
        assert_matches!(
            catalog
                .update(rental.id, request(car.id, day(2024, 6, 1), day(2024, 6, 3), "Leuven"))
                .await,
            Err(RentalError::NotFound(_))
        );
    }
}
