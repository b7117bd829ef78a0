use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{EmailAddress, LicensePlate};
use crate::error::RegistryError;
use crate::model::{Car, NewCar};
use crate::repo::{RepoError, Store};
use crate::service::{Clock, LifecycleEvent, NotificationSink};

/// Car inventory management
#[derive(Clone)]
pub struct CarRegistry {
    store: Arc<dyn Store>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl CarRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, sink, clock }
    }

    #[tracing::instrument(name = "Register a car", skip(self))]
    pub async fn register(&self, new_car: NewCar) -> Result<Car, RegistryError> {
        let car = self
            .store
            .insert_car(&new_car, self.clock.now())
            .await
            .map_err(|e| duplicate_plate(e, &new_car))?;
        tracing::info!("Car {} registered", car.id);
        Ok(car)
    }

    /// Replace every field of a registered car
    #[tracing::instrument(name = "Update a car", skip(self))]
    pub async fn update(&self, id: Uuid, car: NewCar) -> Result<Car, RegistryError> {
        self.store
            .update_car(id, &car, self.clock.now())
            .await
            .map_err(|e| duplicate_plate(e, &car))?
            .ok_or(RegistryError::NotFound(id))
    }

    #[tracing::instrument(name = "Fetch a car", skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Car, RegistryError> {
        self.store
            .fetch_car(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    #[tracing::instrument(name = "Fetch all cars", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Car>, RegistryError> {
        Ok(self.store.fetch_cars().await?)
    }

    #[tracing::instrument(name = "Fetch cars available for rent", skip(self))]
    pub async fn list_available(&self) -> Result<Vec<Car>, RegistryError> {
        Ok(self.store.fetch_available_cars().await?)
    }

    #[tracing::instrument(name = "Fetch cars of an owner", skip(self))]
    pub async fn list_by_owner(&self, owner: &EmailAddress) -> Result<Vec<Car>, RegistryError> {
        Ok(self.store.fetch_cars_by_owner(owner).await?)
    }

    /// `None` when no registered car carries the plate
    #[tracing::instrument(name = "Find a car by license plate", skip(self))]
    pub async fn find_by_license_plate(
        &self,
        plate: &LicensePlate,
    ) -> Result<Option<Car>, RegistryError> {
        Ok(self.store.fetch_car_by_plate(plate).await?)
    }

    /// Remove a car together with its bookings.
    ///
    /// Every removed booking is reported to its owner and renter as a cancellation
    /// once the removal is committed.
    #[tracing::instrument(name = "Remove a car", skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<Car, RegistryError> {
        let mut uow = self.store.begin().await?;

        let car = uow.lock_car(id).await?.ok_or(RegistryError::NotFound(id))?;
        let bookings = uow.bookings_for_car(id).await?;

        if !uow.delete_car(id).await? {
            return Err(RegistryError::NotFound(id));
        }
        uow.commit().await?;

        tracing::info!("Car {} removed, cancelling {} bookings", id, bookings.len());
        for booking in bookings {
            self.sink
                .publish(LifecycleEvent::BookingCancelled {
                    booking,
                    car: car.clone(),
                })
                .await;
        }

        Ok(car)
    }
}

fn duplicate_plate(e: RepoError, car: &NewCar) -> RegistryError {
    match e {
        RepoError::Conflict(_) => RegistryError::DuplicatePlate(car.license_plate.clone()),
        other => other.into(),
    }
}
