use reqwest::Method;

use carshare::domain::Role;

use crate::helpers::{NewCar, NewRent, TestApp, ADMIN, OWNER, RENTER};

#[tokio::test]
async fn owners_can_register_cars() {
    let app = TestApp::spawn().await;

    let res = app
        .car_create(OWNER, &NewCar::golf("1-abc-123"))
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 201);

    let car: serde_json::Value = res.json().await.unwrap();
    assert_eq!(car["license_plate"], "1-ABC-123");
    assert_eq!(car["owner_email"], OWNER);

    let (status, plate) = app.get_json("cars/license/1-ABC-123", (RENTER, Role::Renter)).await;
    assert_eq!(status, 200);
    assert_eq!(plate["id"], car["id"]);
}

#[tokio::test]
async fn registering_requires_a_valid_token() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::POST, "cars")
        .json(&NewCar::golf("1-ABC-123"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 401);

    let res = app
        .request(Method::GET, "cars")
        .bearer_auth("garbage.token")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn renters_cannot_register_cars() {
    let app = TestApp::spawn().await;

    let res = app
        .authorized_request(Method::POST, "cars", Some((RENTER, Role::Renter)))
        .json(&NewCar::golf("1-ABC-123"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(res.status().as_u16(), 403);
}

#[tokio::test]
async fn invalid_cars_are_rejected() {
    let app = TestApp::spawn().await;

    let test_cases: Vec<(&str, NewCar)> = vec![
        ("malformed license plate", NewCar::golf("not a plate!")),
        (
            "no seats",
            NewCar {
                number_of_seats: 0,
                ..NewCar::golf("1-ABC-123")
            },
        ),
        (
            "empty brand",
            NewCar {
                brand: " ".into(),
                ..NewCar::golf("1-ABC-123")
            },
        ),
    ];

    for (desc, car) in test_cases {
        let res = app
            .car_create(OWNER, &car)
            .await
            .expect("Failed to execute request");

        assert_eq!(
            res.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload was {}.",
            desc
        );
    }
}

#[tokio::test]
async fn duplicate_license_plates_conflict() {
    let app = TestApp::spawn().await;
    app.registered_car("1-ABC-123").await;

    let res = app
        .car_create("other@carshare.be", &NewCar::golf("1-ABC-123"))
        .await
        .expect("Failed to execute request");

    assert_eq!(res.status().as_u16(), 409);
}

#[tokio::test]
async fn available_cars_and_owner_listing() {
    let app = TestApp::spawn().await;
    app.registered_car("1-ABC-123").await;
    let hidden = NewCar {
        available_for_rent: false,
        ..NewCar::golf("2-XYZ-987")
    };
    app.car_create(OWNER, &hidden).await.unwrap();

    let (status, available) = app.get_json("cars/available", (RENTER, Role::Renter)).await;
    assert_eq!(status, 200);
    assert_eq!(available.as_array().unwrap().len(), 1);

    let (status, owned) = app
        .get_json(&format!("cars/owner/{}", OWNER), (RENTER, Role::Renter))
        .await;
    assert_eq!(status, 200);
    assert_eq!(owned.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_the_owner_may_update_a_car() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let changes = NewCar {
        model: "Polo".into(),
        ..NewCar::golf("1-ABC-123")
    };

    let res = app
        .authorized_request(
            Method::PUT,
            &format!("cars/{}", car_id),
            Some(("other@carshare.be", Role::Owner)),
        )
        .json(&changes)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = app
        .authorized_request(Method::PUT, &format!("cars/{}", car_id), Some((OWNER, Role::Owner)))
        .json(&changes)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let (_, car) = app.get_json(&format!("cars/{}", car_id), (ADMIN, Role::Admin)).await;
    assert_eq!(car["model"], "Polo");
    assert_eq!(car["owner_email"], OWNER);
}

#[tokio::test]
async fn deleting_a_car_cancels_its_rents() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let res = app
        .rent_create(RENTER, &NewRent::new(&car_id, "2024-06-01", "2024-06-05"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    let res = app
        .authorized_request(Method::DELETE, &format!("cars/{}", car_id), Some((OWNER, Role::Owner)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);

    let (status, _) = app.get_json(&format!("cars/{}", car_id), (ADMIN, Role::Admin)).await;
    assert_eq!(status, 404);
    let (_, rents) = app.get_json("rents", (ADMIN, Role::Admin)).await;
    assert!(rents.as_array().unwrap().is_empty());

    let (_, history) = app.get_json("notifications", (RENTER, Role::Renter)).await;
    let kinds: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"BOOKING_CANCELLED"));
}

#[tokio::test]
async fn availability_lists_free_ranges() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    app.rent_create(RENTER, &NewRent::new(&car_id, "2024-06-05", "2024-06-07"))
        .await
        .unwrap();

    let (status, free) = app
        .get_json(
            &format!("cars/{}/availability?from=2024-06-01&to=2024-06-10", car_id),
            (RENTER, Role::Renter),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        free,
        serde_json::json!([
            { "start_date": "2024-06-01", "end_date": "2024-06-04" },
            { "start_date": "2024-06-08", "end_date": "2024-06-10" },
        ])
    );
}
