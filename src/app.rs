use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tokio::task::JoinHandle;

use tracing_actix_web::TracingLogger;

use crate::client::DeliveryChannel;
use crate::controller::{admin, bookings, cars, notifications, rentals};
use crate::crypto::SigningKey;
use crate::repo::Store;
use crate::service::{
    BookingManager, CarRegistry, Clock, Dispatcher, NotificationSink, QueuedSink, ReminderSweep,
    RentalCatalog,
};
use crate::settings::DispatchMode;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Services shared by every request handler
#[derive(Clone)]
pub struct Services {
    pub bookings: BookingManager,
    pub cars: CarRegistry,
    pub rentals: RentalCatalog,
    pub notifications: Arc<Dispatcher>,
    pub reminders: Arc<ReminderSweep>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Wire the services over a store and a delivery channel.
    /// Queued dispatch spawns its worker, so this must run inside a tokio runtime.
    /// Drain the returned worker on shutdown, after every clone of the services is gone.
    pub fn new(
        store: Arc<dyn Store>,
        channel: Arc<dyn DeliveryChannel>,
        clock: Arc<dyn Clock>,
        mode: DispatchMode,
        queue_capacity: usize,
    ) -> (Self, NotificationWorker) {
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), channel, clock.clone()));

        let (sink, worker): (Arc<dyn NotificationSink>, Option<JoinHandle<()>>) = match mode {
            DispatchMode::Inline => (dispatcher.clone(), None),
            DispatchMode::Queued => {
                let (sink, worker) = QueuedSink::spawn(dispatcher.clone(), queue_capacity);
                (Arc::new(sink), Some(worker))
            }
        };

        let services = Self {
            bookings: BookingManager::new(store.clone(), sink.clone(), clock.clone()),
            cars: CarRegistry::new(store.clone(), sink, clock.clone()),
            rentals: RentalCatalog::new(store.clone(), clock.clone()),
            reminders: Arc::new(ReminderSweep::new(store, dispatcher.clone())),
            notifications: dispatcher,
            clock,
        };
        (services, NotificationWorker(worker))
    }

    /// Periodically send reminders and purge notifications older than `retention_days`
    pub fn spawn_maintenance(&self, interval: Duration, retention_days: u32) -> JoinHandle<()> {
        let services = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                services.run_maintenance(retention_days).await;
            }
        })
    }

    #[tracing::instrument(name = "Run maintenance", skip(self))]
    async fn run_maintenance(&self, retention_days: u32) {
        let now = self.clock.now();

        if let Err(error) = self.reminders.send_reminders(now.date_naive()).await {
            tracing::error!(error.cause_chain = ?error, "Reminder sweep failed");
        }

        let Some(cutoff) = now.checked_sub_signed(chrono::Duration::days(i64::from(retention_days)))
        else {
            tracing::warn!("Retention of {} days is out of range, skipping purge", retention_days);
            return;
        };
        if let Err(error) = self.notifications.purge_older_than(cutoff).await {
            tracing::error!(error.cause_chain = ?error, "Notification retention sweep failed");
        }
    }
}

/// Handle on the queued notification worker, empty in inline dispatch mode
#[must_use = "drain the worker on shutdown or queued notifications are lost"]
pub struct NotificationWorker(Option<JoinHandle<()>>);

impl NotificationWorker {
    /// Wait up to `grace` for the queue to empty.
    /// The queue only closes once every `Services` clone has been dropped.
    #[tracing::instrument(name = "Drain notification queue", skip(self))]
    pub async fn drain(self, grace: Duration) {
        let Some(handle) = self.0 else {
            return;
        };
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => tracing::info!("Notification queue drained"),
            Ok(Err(error)) => {
                tracing::error!(error.cause_chain = ?error, "Notification worker failed")
            }
            Err(_) => tracing::warn!("Notification queue still busy after {:?}, giving up", grace),
        }
    }
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    services: Services,
    signing_key: SigningKey,
) -> anyhow::Result<Server> {
    // Wrap application data
    let signing_key = web::Data::new(signing_key);
    let booking_manager = web::Data::new(services.bookings);
    let car_registry = web::Data::new(services.cars);
    let rental_catalog = web::Data::new(services.rentals);
    let dispatcher = web::Data::from(services.notifications);
    let reminders = web::Data::from(services.reminders);
    let clock: web::Data<dyn Clock> = web::Data::from(services.clock);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(signing_key.clone())
            .app_data(booking_manager.clone())
            .app_data(car_registry.clone())
            .app_data(rental_catalog.clone())
            .app_data(dispatcher.clone())
            .app_data(reminders.clone())
            .app_data(clock.clone())
            .service(health_check)
            .service(cars::scope())
            .service(bookings::scope())
            .service(rentals::scope())
            .service(notifications::scope())
            .service(admin::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
