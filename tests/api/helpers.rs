use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::Serialize;
use serde_json::Value;

use url::Url;

use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use carshare::app::{self, Services};
use carshare::auth::Principal;
use carshare::client::EmailClient;
use carshare::crypto::SigningKey;
use carshare::domain::Role;
use carshare::repo::MemoryStore;
use carshare::service::FixedClock;
use carshare::settings::DispatchMode;

lazy_static::lazy_static! {
    static ref TRACING: () = {
        // NOTE: Set TEST_LOG to see application logs while testing
        if std::env::var("TEST_LOG").is_ok() {
            let subscriber = carshare::telemetry::create_subscriber("debug", std::io::stdout);
            carshare::telemetry::set_subscriber(subscriber).expect("Failed to set subscriber");
        }
    };
}

pub const ADMIN: &str = "admin@carshare.be";
pub const OWNER: &str = "owner@carshare.be";
pub const RENTER: &str = "renter@carshare.be";

#[derive(Debug, Clone, Serialize)]
pub struct NewCar {
    pub brand: String,
    pub model: String,
    pub license_plate: String,
    pub number_of_seats: i32,
    pub available_for_rent: bool,
}

impl NewCar {
    pub fn golf(license_plate: &str) -> Self {
        Self {
            brand: "Volkswagen".into(),
            model: "Golf".into(),
            license_plate: license_plate.into(),
            number_of_seats: 5,
            available_for_rent: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRent {
    pub car_id: String,
    pub start_date: String,
    pub end_date: String,
    pub phone_number: String,
    pub national_register_id: String,
    pub birth_date: String,
    pub driving_license_number: String,
}

impl NewRent {
    pub fn new(car_id: &str, start_date: &str, end_date: &str) -> Self {
        Self {
            car_id: car_id.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            phone_number: "+32 470 12 34 56".into(),
            national_register_id: "90.02.01-997.04".into(),
            birth_date: "1990-02-01".into(),
            driving_license_number: "1234567890".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRental {
    pub car_id: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub city: String,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
}

impl NewRental {
    pub fn new(car_id: &str, start_date: &str, end_date: &str, city: &str) -> Self {
        Self {
            car_id: car_id.into(),
            start_date: start_date.into(),
            start_time: "09:00:00".into(),
            end_date: end_date.into(),
            end_time: "18:00:00".into(),
            street: "Naamsestraat".into(),
            number: "22".into(),
            postal_code: "3000".into(),
            city: city.into(),
            contact_name: "Olivia Owner".into(),
            phone: "+32 470 00 00 00".into(),
            email: OWNER.into(),
        }
    }
}

pub struct TestApp {
    addr: String,
    signing_key: SigningKey,

    pub client: Client,
    pub email_server: MockServer,
}

impl TestApp {
    /// Spawn the app on a random port with in-memory storage, a mock email API
    /// and the clock frozen at 2024-05-01 09:00 UTC
    pub async fn spawn() -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        lazy_static::initialize(&TRACING);

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let signing_key = {
            let rand_key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            let rand_key = Secret::new(rand_key);

            SigningKey::new(&rand_key).expect("Failed to create crypto signing key")
        };

        let email_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&email_server)
            .await;

        let email_client = {
            let sender = "test@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let (services, _worker) = Services::new(
            Arc::new(MemoryStore::new()),
            Arc::new(email_client),
            Arc::new(clock),
            DispatchMode::Inline,
            16,
        );

        let server = app::run(listener, services, signing_key.clone())
            .expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            signing_key,
            client,
            email_server,
        }
    }

    /// Bearer token for a user with the given role
    pub fn token(&self, email: &str, role: Role) -> String {
        let principal = Principal::new(email.parse().expect("Failed to parse email"), role);
        principal
            .issue_token(&self.signing_key, None)
            .expect("Failed to sign token")
            .as_ref()
            .to_string()
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub fn authorized_request(
        &self,
        method: Method,
        url: &str,
        user: Option<(&str, Role)>,
    ) -> reqwest::RequestBuilder {
        let req = self.request(method, url);
        if let Some((email, role)) = user {
            req.bearer_auth(self.token(email, role))
        } else {
            req
        }
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn car_create(&self, owner: &str, car: &NewCar) -> reqwest::Result<Response> {
        self.authorized_request(Method::POST, "cars", Some((owner, Role::Owner)))
            .json(car)
            .send()
            .await
    }

    /// Register a car for `OWNER` and return its id
    pub async fn registered_car(&self, license_plate: &str) -> String {
        let res = self
            .car_create(OWNER, &NewCar::golf(license_plate))
            .await
            .expect("Failed to execute request");
        assert_eq!(res.status().as_u16(), 201);

        let car: Value = res.json().await.expect("Failed to parse car");
        car["id"].as_str().expect("Car without id").to_string()
    }

    pub async fn rent_create(&self, renter: &str, rent: &NewRent) -> reqwest::Result<Response> {
        self.authorized_request(Method::POST, "rents", Some((renter, Role::Renter)))
            .json(rent)
            .send()
            .await
    }

    pub async fn rental_create(
        &self,
        user: (&str, Role),
        rental: &NewRental,
    ) -> reqwest::Result<Response> {
        self.authorized_request(Method::POST, "rentals", Some(user))
            .json(rental)
            .send()
            .await
    }

    pub async fn get_json(&self, url: &str, user: (&str, Role)) -> (u16, Value) {
        let res = self
            .authorized_request(Method::GET, url, Some(user))
            .send()
            .await
            .expect("Failed to execute request");
        let status = res.status().as_u16();
        let body = res.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}
