#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use http_body_util::BodyExt;
use time::macros::offset;
use tower::ServiceExt;
use uuid::Uuid;

use tiffin::config::AppConfig;
use tiffin::infra::{db::Db, push::PushClient};
use tiffin::{http, AppState};

// 32 bytes base64-encoded, test-only keys
// "0123456789abcdef0123456789abcdef"
const TEST_PASETO_ACCESS_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
// "fedcba9876543210fedcba9876543210"
const TEST_PASETO_REFRESH_KEY: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";

pub const DEFAULT_PASSWORD: &str = "testpassword123";

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub handle: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// The app, or `None` when no test database is configured —
/// callers should return early in that case.
///
/// Each call builds a fresh app: `#[tokio::test]` gives every test its
/// own runtime, and a connection pool outliving the runtime it was
/// created on hangs later tests, so the app cannot be cached globally.
pub async fn try_app() -> Option<&'static TestApp> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    Some(Box::leak(Box::new(TestApp::setup(database_url).await)))
}

#[macro_export]
macro_rules! require_app {
    () => {
        match common::try_app().await {
            Some(app) => app,
            None => {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

impl TestApp {
    async fn setup(database_url: String) -> Self {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let decode_key = |value: &str| -> [u8; 32] {
            let bytes = STANDARD.decode(value).expect("valid base64 key");
            bytes.try_into().expect("32-byte key")
        };

        let config = AppConfig {
            http_addr: "127.0.0.1:0".into(),
            database_url,
            db_max_connections: 5,
            db_connect_timeout_seconds: 5,
            db_idle_timeout_seconds: 60,
            paseto_access_key: decode_key(TEST_PASETO_ACCESS_KEY),
            paseto_refresh_key: decode_key(TEST_PASETO_REFRESH_KEY),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
            push_endpoint: None,
            push_api_key: None,
            push_timeout_seconds: 5,
            mess_tz: offset!(+5:30),
        };

        let db = Db::connect(&config).await.expect("connect test database");
        let push = PushClient::new(&config).expect("push client");

        let state = AppState {
            db,
            push,
            paseto_access_key: config.paseto_access_key,
            paseto_refresh_key: config.paseto_refresh_key,
            access_ttl_minutes: config.access_ttl_minutes,
            refresh_ttl_days: config.refresh_ttl_days,
            mess_tz: config.mess_tz,
        };

        let router = http::router(state.clone());
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request should complete");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, path, Some(body), token).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PATCH, path, Some(body), token).await
    }

    /// Signs up and logs in a fresh user. Handles get a random suffix so
    /// test binaries can share one database.
    pub async fn create_user(&self, prefix: &str, role: &str) -> TestUser {
        let suffix = Uuid::new_v4().simple().to_string();
        let handle = format!("{}_{}", prefix, &suffix[..12]);
        let email = format!("{}@test.example", handle);

        let resp = self
            .post_json(
                "/auth/signup",
                json!({
                    "handle": handle,
                    "email": email,
                    "display_name": prefix,
                    "role": role,
                    "password": DEFAULT_PASSWORD,
                }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "signup: {}", resp.error_message());
        let id = Uuid::parse_str(resp.json()["id"].as_str().unwrap()).unwrap();

        let resp = self
            .post_json(
                "/auth/login",
                json!({ "identifier": handle, "password": DEFAULT_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login: {}", resp.error_message());
        let body = resp.json();

        TestUser {
            id,
            handle,
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Promotes a fresh user to admin in the database, then logs in again
    /// so the access token carries the admin role claim.
    pub async fn create_admin(&self, prefix: &str) -> TestUser {
        let user = self.create_user(prefix, "customer").await;

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user.id)
            .execute(self.state.db.pool())
            .await
            .expect("promote user to admin");

        let resp = self
            .post_json(
                "/auth/login",
                json!({ "identifier": user.handle, "password": DEFAULT_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login: {}", resp.error_message());
        let body = resp.json();

        TestUser {
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
            ..user
        }
    }

    /// Creates a mess owned by `owner`, returning its id.
    pub async fn create_mess(&self, owner: &TestUser) -> Uuid {
        let resp = self
            .post_json(
                "/messes",
                json!({
                    "name": format!("{} mess", owner.handle),
                    "address": "FC Road, Pune",
                    "latitude": 18.5204,
                    "longitude": 73.8567,
                    "rate_breakfast": 40,
                    "rate_lunch": 80,
                    "rate_dinner": 70,
                }),
                Some(&owner.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "create mess: {}", resp.error_message());
        Uuid::parse_str(resp.json()["id"].as_str().unwrap()).unwrap()
    }

    /// Subscribes `customer` to `mess_id` for the given range and slots,
    /// returning the subscription id.
    pub async fn create_subscription(
        &self,
        customer: &TestUser,
        mess_id: Uuid,
        slots: &[&str],
        start: &str,
        end: &str,
    ) -> Uuid {
        let resp = self
            .post_json(
                "/subscriptions",
                json!({
                    "mess_id": mess_id,
                    "meal_slots": slots,
                    "start_date": start,
                    "end_date": end,
                }),
                Some(&customer.access_token),
            )
            .await;
        assert_eq!(
            resp.status,
            StatusCode::CREATED,
            "create subscription: {}",
            resp.error_message()
        );
        Uuid::parse_str(resp.json()["id"].as_str().unwrap()).unwrap()
    }
}

/// `YYYY-MM-DD` for a date `days` from now in the app's mess zone.
pub fn date_in_days(days: i64) -> String {
    let date = (time::OffsetDateTime::now_utc().to_offset(offset!(+5:30))
        + time::Duration::days(days))
    .date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
