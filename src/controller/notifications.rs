use actix_web::dev::HttpServiceFactory;
use actix_web::{get, put, web, HttpResponse, Responder};

use serde_json::json;

use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{RestError, RestResult};
use crate::service::{Clock, Dispatcher};

#[tracing::instrument(name = "Fetch notification history", skip(dispatcher))]
#[get("")]
async fn history(principal: Principal, dispatcher: web::Data<Dispatcher>) -> RestResult<impl Responder> {
    let notifications = dispatcher.history(&principal.email).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[tracing::instrument(name = "Fetch unread notifications", skip(dispatcher))]
#[get("/unread")]
async fn unread(principal: Principal, dispatcher: web::Data<Dispatcher>) -> RestResult<impl Responder> {
    let notifications = dispatcher.unread(&principal.email).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[tracing::instrument(name = "Count unread notifications", skip(dispatcher))]
#[get("/unread/count")]
async fn unread_count(
    principal: Principal,
    dispatcher: web::Data<Dispatcher>,
) -> RestResult<impl Responder> {
    let count = dispatcher.unread_count(&principal.email).await?;
    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

#[tracing::instrument(name = "Mark all notifications as read", skip(dispatcher, clock))]
#[put("/read-all")]
async fn read_all(
    principal: Principal,
    dispatcher: web::Data<Dispatcher>,
    clock: web::Data<dyn Clock>,
) -> RestResult<impl Responder> {
    let updated = dispatcher.mark_all_read(&principal.email, clock.now()).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

#[tracing::instrument(name = "Mark a notification as read", skip(dispatcher, clock))]
#[put("/{id}/read")]
async fn read(
    principal: Principal,
    path: web::Path<(Uuid,)>,
    dispatcher: web::Data<Dispatcher>,
    clock: web::Data<dyn Clock>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let notification = dispatcher.get(id).await?;
    // Other users' notifications are reported as missing
    if notification.recipient != principal.email {
        return Err(RestError::NotFound(format!("Notification {} does not exist", id)));
    }

    dispatcher.mark_read(id, clock.now()).await?;
    Ok(HttpResponse::NoContent())
}

/// Notification API endpoints, scoped to the authenticated user
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/notifications")
        .service(history)
        .service(unread)
        .service(unread_count)
        .service(read_all)
        .service(read)
}
