use reqwest::Method;

use serde_json::Value;

use carshare::domain::Role;

use crate::helpers::{NewRental, TestApp, ADMIN, OWNER, RENTER};

#[tokio::test]
async fn owners_can_offer_their_cars_for_rent() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;

    let res = app
        .rental_create(
            (OWNER, Role::Owner),
            &NewRental::new(&car_id, "2024-06-01", "2024-06-03", "Leuven"),
        )
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 201);

    let rental: Value = res.json().await.unwrap();
    assert_eq!(rental["car_id"], car_id.as_str());
    assert_eq!(rental["owner_email"], OWNER);
    assert_eq!(rental["start_date"], "2024-06-01");
    assert_eq!(rental["start_time"], "09:00:00");
    assert_eq!(rental["pickup_point"]["city"], "Leuven");
    assert_eq!(rental["contact"]["email"], OWNER);

    let id = rental["id"].as_str().unwrap();
    let (status, fetched) = app
        .get_json(&format!("rentals/{}", id), (RENTER, Role::Renter))
        .await;
    assert_eq!(status, 200);
    assert_eq!(fetched, rental);
}

#[tokio::test]
async fn rentals_can_be_filtered() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    for (start, end, city) in [
        ("2024-06-01", "2024-06-03", "Leuven"),
        ("2024-06-10", "2024-06-12", "Gent"),
    ] {
        let res = app
            .rental_create((OWNER, Role::Owner), &NewRental::new(&car_id, start, end, city))
            .await
            .expect("Failed to execute request");
        assert_eq!(res.status().as_u16(), 201);
    }
    let renter = (RENTER, Role::Renter);

    let test_cases = vec![
        ("rentals".to_string(), 2),
        (format!("rentals/car/{}", car_id), 2),
        (format!("rentals/owner/{}", OWNER), 2),
        (format!("rentals/owner/{}", RENTER), 0),
        ("rentals/date/2024-06-10".to_string(), 1),
        ("rentals/date/2024-06-11".to_string(), 0),
        ("rentals/city/leuven".to_string(), 1),
        ("rentals/city/Brugge".to_string(), 0),
    ];

    for (url, expected) in test_cases {
        let (status, rentals) = app.get_json(&url, renter).await;
        assert_eq!(status, 200, "GET {} failed", url);
        assert_eq!(
            rentals.as_array().map(Vec::len),
            Some(expected),
            "GET {} returned the wrong rentals",
            url
        );
    }

    let (status, _) = app.get_json("rentals/date/10-06-2024", renter).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn only_the_car_owner_may_manage_its_rentals() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let body = NewRental::new(&car_id, "2024-06-01", "2024-06-03", "Leuven");

    for user in [(RENTER, Role::Renter), ("other@carshare.be", Role::Owner)] {
        let res = app
            .rental_create(user, &body)
            .await
            .expect("Failed to execute request");
        assert_eq!(res.status().as_u16(), 403, "{} offered a car they do not own", user.0);
    }

    let res = app
        .rental_create((ADMIN, Role::Admin), &body)
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 201);
    let rental: Value = res.json().await.unwrap();
    assert_eq!(rental["owner_email"], OWNER);
    let url = format!("rentals/{}", rental["id"].as_str().unwrap());

    let mut moved = body.clone();
    moved.city = "Gent".into();
    let res = app
        .authorized_request(Method::PUT, &url, Some(("other@carshare.be", Role::Owner)))
        .json(&moved)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 403);

    let res = app
        .authorized_request(Method::PUT, &url, Some((OWNER, Role::Owner)))
        .json(&moved)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["pickup_point"]["city"], "Gent");

    let res = app
        .authorized_request(Method::DELETE, &url, Some((RENTER, Role::Renter)))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 403);

    let res = app
        .authorized_request(Method::DELETE, &url, Some((OWNER, Role::Owner)))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 204);

    let res = app
        .authorized_request(Method::DELETE, &url, Some((OWNER, Role::Owner)))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn invalid_rentals_are_rejected() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let valid = NewRental::new(&car_id, "2024-06-01", "2024-06-03", "Leuven");

    let test_cases: Vec<(&str, NewRental)> = vec![
        (
            "unknown car",
            NewRental::new(
                "6f1c2b8e-9c1a-4d7e-8a51-0f6a2d3c4b5e",
                "2024-06-01",
                "2024-06-03",
                "Leuven",
            ),
        ),
        (
            "end date before start date",
            NewRental::new(&car_id, "2024-06-03", "2024-06-01", "Leuven"),
        ),
        (
            "same day ending before it starts",
            NewRental {
                end_date: "2024-06-01".into(),
                start_time: "18:00:00".into(),
                end_time: "09:00:00".into(),
                ..valid.clone()
            },
        ),
        (
            "blank city",
            NewRental {
                city: "  ".into(),
                ..valid.clone()
            },
        ),
        (
            "invalid contact email",
            NewRental {
                email: "not an email".into(),
                ..valid.clone()
            },
        ),
        (
            "invalid contact phone",
            NewRental {
                phone: "call me".into(),
                ..valid.clone()
            },
        ),
    ];

    for (description, body) in test_cases {
        let res = app
            .rental_create((OWNER, Role::Owner), &body)
            .await
            .expect("Failed to execute request");
        assert_eq!(
            res.status().as_u16(),
            400,
            "The API did not reject a rental with {}",
            description
        );
    }
}

#[tokio::test]
async fn removing_a_car_withdraws_its_rentals() {
    let app = TestApp::spawn().await;
    let car_id = app.registered_car("1-ABC-123").await;
    let res = app
        .rental_create(
            (OWNER, Role::Owner),
            &NewRental::new(&car_id, "2024-06-01", "2024-06-03", "Leuven"),
        )
        .await
        .expect("Failed to execute request");
    let rental: Value = res.json().await.unwrap();

    let res = app
        .authorized_request(Method::DELETE, &format!("cars/{}", car_id), Some((OWNER, Role::Owner)))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 204);

    let (status, _) = app
        .get_json(
            &format!("rentals/{}", rental["id"].as_str().unwrap()),
            (ADMIN, Role::Admin),
        )
        .await;
    assert_eq!(status, 404);
}
