use reqwest::Method;

use serde_json::Value;

use carshare::domain::Role;

use crate::helpers::{NewRent, TestApp, ADMIN, OWNER, RENTER};

async fn rent(app: &TestApp, car_id: &str, start: &str, end: &str) -> Value {
    let res = app
        .rent_create(RENTER, &NewRent::new(car_id, start, end))
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 201);
    res.json().await.expect("Failed to parse rent")
}

fn kinds(notifications: &Value) -> Vec<String> {
    notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn renting_a_car_notifies_owner_and_renter() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;

    let booking = rent(&app, &car_id, "2024-06-01", "2024-06-05").await;

    assert_eq!(booking["car_id"], car_id.as_str());
    assert_eq!(booking["owner_email"], OWNER);
    assert_eq!(booking["renter_email"], RENTER);
    assert_eq!(booking["start_date"], "2024-06-01");
    assert_eq!(booking["end_date"], "2024-06-05");

    let (_, owner) = app.get_json("notifications", (OWNER, Role::Owner)).await;
    assert_eq!(kinds(&owner), vec!["NEW_BOOKING"]);
    assert_eq!(owner[0]["status"], "SENT");
    let (_, renter) = app.get_json("notifications", (RENTER, Role::Renter)).await;
    assert_eq!(kinds(&renter), vec!["BOOKING_CONFIRMATION"]);

    let received = app.email_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn overlapping_rents_conflict() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    rent(&app, &car_id, "2024-06-01", "2024-06-05").await;

    let res = app
        .rent_create(RENTER, &NewRent::new(&car_id, "2024-06-05", "2024-06-09"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);

    rent(&app, &car_id, "2024-06-06", "2024-06-09").await;
}

#[tokio::test]
async fn invalid_rents_are_rejected() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;

    let test_cases: Vec<(&str, NewRent)> = vec![
        (
            "end before start",
            NewRent::new(&car_id, "2024-06-05", "2024-06-01"),
        ),
        (
            "malformed register id",
            NewRent {
                national_register_id: "12345".into(),
                ..NewRent::new(&car_id, "2024-06-01", "2024-06-05")
            },
        ),
        (
            "short driving license",
            NewRent {
                driving_license_number: "123".into(),
                ..NewRent::new(&car_id, "2024-06-01", "2024-06-05")
            },
        ),
        (
            "malformed date",
            NewRent::new(&car_id, "01/06/2024", "2024-06-05"),
        ),
    ];

    for (desc, rent) in test_cases {
        let res = app.rent_create(RENTER, &rent).await.unwrap();

        assert_eq!(
            res.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload was {}.",
            desc
        );
    }
}

#[tokio::test]
async fn renting_a_missing_car_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .rent_create(
            RENTER,
            &NewRent::new(&uuid::Uuid::new_v4().to_string(), "2024-06-01", "2024-06-05"),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    let (_, notifications) = app.get_json("notifications", (RENTER, Role::Renter)).await;
    assert!(notifications.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cancelling_a_rent() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let booking = rent(&app, &car_id, "2024-06-01", "2024-06-05").await;
    let url = format!("rents/{}", booking["id"].as_str().unwrap());

    let res = app
        .authorized_request(Method::DELETE, &url, Some(("stranger@carshare.be", Role::Renter)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = app
        .authorized_request(Method::DELETE, &url, Some((RENTER, Role::Renter)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);

    let (_, active) = app
        .get_json(&format!("rents/active-or-upcoming/{}", car_id), (OWNER, Role::Owner))
        .await;
    assert!(active.as_array().unwrap().is_empty());

    let (_, owner) = app.get_json("notifications", (OWNER, Role::Owner)).await;
    assert!(kinds(&owner).contains(&"BOOKING_CANCELLED".to_string()));
    let (_, renter) = app.get_json("notifications", (RENTER, Role::Renter)).await;
    assert!(kinds(&renter).contains(&"BOOKING_CANCELLED".to_string()));

    let res = app
        .authorized_request(Method::DELETE, &url, Some((RENTER, Role::Renter)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn rent_queries() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let past = rent(&app, &car_id, "2024-04-01", "2024-04-03").await;
    let upcoming = rent(&app, &car_id, "2024-06-01", "2024-06-05").await;

    let (status, by_car) = app
        .get_json(&format!("rents/by-car/{}", car_id), (OWNER, Role::Owner))
        .await;
    assert_eq!(status, 200);
    assert_eq!(by_car.as_array().unwrap().len(), 2);

    // The clock is frozen at 2024-05-01
    let (_, active) = app
        .get_json(&format!("rents/active-or-upcoming/{}", car_id), (OWNER, Role::Owner))
        .await;
    assert_eq!(active, Value::Array(vec![upcoming.clone()]));

    let (_, mine) = app
        .get_json(&format!("rents/renter/{}", RENTER), (RENTER, Role::Renter))
        .await;
    assert_eq!(mine, Value::Array(vec![past, upcoming]));

    let (status, _) = app
        .get_json(&format!("rents/renter/{}", RENTER), (OWNER, Role::Owner))
        .await;
    assert_eq!(status, 403);

    let (status, by_id) = app
        .get_json("rents/by-register-id?id=90.02.01-997.04", (ADMIN, Role::Admin))
        .await;
    assert_eq!(status, 200);
    assert_eq!(by_id.as_array().unwrap().len(), 2);

    let (status, _) = app
        .get_json(
            &format!("rents/by-car/{}", uuid::Uuid::new_v4()),
            (ADMIN, Role::Admin),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn active_rents_of_a_car_are_private_to_its_owner() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    rent(&app, &car_id, "2024-06-01", "2024-06-05").await;
    let url = format!("rents/active-or-upcoming/{}", car_id);

    let (status, body) = app.get_json(&url, ("other@carshare.be", Role::Renter)).await;
    assert_eq!(status, 403);
    assert!(!body.to_string().contains("90.02.01-997.04"));

    let (status, _) = app.get_json(&url, (RENTER, Role::Renter)).await;
    assert_eq!(status, 403);

    let (status, active) = app.get_json(&url, (ADMIN, Role::Admin)).await;
    assert_eq!(status, 200);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, _) = app
        .get_json(
            &format!("rents/active-or-upcoming/{}", uuid::Uuid::new_v4()),
            (OWNER, Role::Owner),
        )
        .await;
    assert_eq!(status, 404);
}
