use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use chrono::{Duration, Utc};

use sqlx::PgPool;

use carshare::app::{self, Services};
use carshare::auth::Principal;
use carshare::client::EmailClient;
use carshare::crypto::SigningKey;
use carshare::domain::{EmailAddress, Role};
use carshare::repo::{MemoryStore, PgStore, Store};
use carshare::service::SystemClock;
use carshare::settings::{Settings, StorageBackend};
use carshare::telemetry;

/// How long queued notifications may take to go out once the server stopped
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let signing_key = SigningKey::new(settings.app.secret_key())?;

    // Operator helper: `carshare issue-token <email> <role> [valid_hours]`
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("issue-token") {
        return issue_token(&args[1..], &signing_key);
    }

    telemetry::init()?;

    let store: Arc<dyn Store> = match settings.storage {
        StorageBackend::Postgres => {
            let pool = PgPool::connect_with(settings.database.with_db())
                .await
                .context("Failed to connect to Postgres")?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let email_client = EmailClient::new(
        settings.email.sender()?,
        settings.email.api_timeout(),
        settings.email.api_base_url()?,
        settings.email.api_auth_token(),
    )?;

    let (services, worker) = Services::new(
        store,
        Arc::new(email_client),
        Arc::new(SystemClock),
        settings.notifications.mode,
        settings.notifications.queue_capacity,
    );
    let maintenance = settings
        .notifications
        .maintenance_interval()
        .map(|interval| services.spawn_maintenance(interval, settings.notifications.retention_days));

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let served = app::run(listener, services, signing_key)?
        .await
        .context("Failed to run app");

    // The maintenance task holds a clone of the services, which keeps the queue open
    if let Some(maintenance) = maintenance {
        maintenance.abort();
        let _ = maintenance.await;
    }
    worker.drain(SHUTDOWN_GRACE).await;

    served
}

fn issue_token(args: &[String], signing_key: &SigningKey) -> anyhow::Result<()> {
    let [email, role, rest @ ..] = args else {
        anyhow::bail!("Usage: carshare issue-token <email> <role> [valid_hours]");
    };

    let email: EmailAddress = email.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let role: Role = role.parse()?;
    let expires_at = match rest.first() {
        Some(hours) => {
            let hours: i64 = hours.parse().context("valid_hours must be a whole number")?;
            let expires_at = Duration::try_hours(hours)
                .and_then(|valid_for| Utc::now().checked_add_signed(valid_for))
                .context("valid_hours is out of range")?;
            Some(expires_at)
        }
        None => None,
    };

    let token = Principal::new(email, role).issue_token(signing_key, expires_at)?;
    println!("{}", token.as_ref());
    Ok(())
}
