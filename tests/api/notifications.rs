use reqwest::Method;

use serde_json::Value;

use carshare::domain::Role;

use crate::helpers::{NewRent, TestApp, ADMIN, OWNER, RENTER};

async fn booked_app() -> (TestApp, String) {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let res = app
        .rent_create(RENTER, &NewRent::new(&car_id, "2024-05-02", "2024-05-04"))
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 201);
    (app, car_id)
}

async fn unread_count(app: &TestApp, user: (&str, Role)) -> i64 {
    let (status, body) = app.get_json("notifications/unread/count", user).await;
    assert_eq!(status, 200);
    body["count"].as_i64().unwrap()
}

#[tokio::test]
async fn notifications_can_be_read_one_by_one() {
    let (app, _) = booked_app().await;
    let renter = (RENTER, Role::Renter);
    assert_eq!(unread_count(&app, renter).await, 1);

    let (_, unread) = app.get_json("notifications/unread", renter).await;
    let id = unread[0]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let res = app
            .authorized_request(Method::PUT, &format!("notifications/{}/read", id), Some(renter))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 204);
    }

    assert_eq!(unread_count(&app, renter).await, 0);
    let (_, history) = app.get_json("notifications", renter).await;
    assert_eq!(history[0]["status"], "READ");
    assert!(!history[0]["read_at"].is_null());
}

#[tokio::test]
async fn other_users_notifications_are_hidden() {
    let (app, _) = booked_app().await;
    let (_, unread) = app.get_json("notifications/unread", (RENTER, Role::Renter)).await;
    let id = unread[0]["id"].as_str().unwrap().to_string();

    let res = app
        .authorized_request(
            Method::PUT,
            &format!("notifications/{}/read", id),
            Some((OWNER, Role::Owner)),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(unread_count(&app, (RENTER, Role::Renter)).await, 1);
}

#[tokio::test]
async fn read_all_is_idempotent() {
    let (app, _) = booked_app().await;
    let owner = (OWNER, Role::Owner);

    let mut updated = Vec::new();
    for _ in 0..2 {
        let res = app
            .authorized_request(Method::PUT, "notifications/read-all", Some(owner))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        let body: Value = res.json().await.unwrap();
        updated.push(body["updated"].as_u64().unwrap());
    }

    assert_eq!(updated, vec![1, 0]);
    assert_eq!(unread_count(&app, owner).await, 0);
}

#[tokio::test]
async fn admin_endpoints_require_the_admin_role() {
    let (app, _) = booked_app().await;

    for (method, url) in [
        (Method::DELETE, "admin/notifications/cleanup"),
        (Method::POST, "admin/notifications/reminders"),
    ] {
        let res = app
            .authorized_request(method, url, Some((OWNER, Role::Owner)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 403);
    }
}

#[tokio::test]
async fn reminder_sweep_runs_once_per_booking() {
    let (app, _) = booked_app().await;
    let admin = Some((ADMIN, Role::Admin));

    // The clock is frozen at 2024-05-01 and the rent starts the next day
    let mut reports = Vec::new();
    for _ in 0..2 {
        let res = app
            .authorized_request(Method::POST, "admin/notifications/reminders", admin)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        let report: Value = res.json().await.unwrap();
        reports.push(report["pickup_reminders"].as_u64().unwrap());
    }
    assert_eq!(reports, vec![1, 0]);

    let res = app
        .authorized_request(
            Method::POST,
            "admin/notifications/reminders?date=2024-05-03",
            admin,
        )
        .send()
        .await
        .unwrap();
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["return_reminders"], 1);

    let (_, history) = app.get_json("notifications", (RENTER, Role::Renter)).await;
    let kinds: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&"RENTAL_REMINDER"));
    assert!(kinds.contains(&"RETURN_REMINDER"));
}

#[tokio::test]
async fn cleanup_keeps_recent_notifications() {
    let (app, _) = booked_app().await;

    let res = app
        .authorized_request(
            Method::DELETE,
            "admin/notifications/cleanup?days_old=30",
            Some((ADMIN, Role::Admin)),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["deleted"], 0);

    let res = app
        .authorized_request(
            Method::DELETE,
            "admin/notifications/cleanup?days_old=-1",
            Some((ADMIN, Role::Admin)),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}
