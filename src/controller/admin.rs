use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, post, web, HttpResponse, Responder};

use chrono::{Duration, NaiveDate};

use serde::Deserialize;
use serde_json::json;

use crate::auth::Principal;
use crate::error::{RestError, RestResult};
use crate::service::{Clock, Dispatcher, ReminderSweep};

const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    days_old: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReminderQuery {
    /// Day the sweep runs for, defaults to today
    date: Option<NaiveDate>,
}

#[tracing::instrument(name = "Clean up old notifications", skip(dispatcher, clock))]
#[delete("/cleanup")]
async fn cleanup(
    principal: Principal,
    query: web::Query<CleanupQuery>,
    dispatcher: web::Data<Dispatcher>,
    clock: web::Data<dyn Clock>,
) -> RestResult<impl Responder> {
    principal.require_admin()?;

    let days_old = query.days_old.unwrap_or(DEFAULT_RETENTION_DAYS);
    if days_old < 0 {
        return Err(RestError::ParseError("days_old cannot be negative".into()));
    }
    let cutoff = Duration::try_days(days_old)
        .and_then(|age| clock.now().checked_sub_signed(age))
        .ok_or_else(|| RestError::ParseError("days_old is out of range".into()))?;

    let deleted = dispatcher.purge_older_than(cutoff).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

#[tracing::instrument(name = "Send rental reminders", skip(reminders, clock))]
#[post("/reminders")]
async fn send_reminders(
    principal: Principal,
    query: web::Query<ReminderQuery>,
    reminders: web::Data<ReminderSweep>,
    clock: web::Data<dyn Clock>,
) -> RestResult<impl Responder> {
    principal.require_admin()?;

    let today = query.date.unwrap_or_else(|| clock.today());
    let report = reminders.send_reminders(today).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Administrative notification endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/admin/notifications")
        .service(cleanup)
        .service(send_reminders)
}
