//! Common test utilities for integration tests.
//!
//! The router runs over the in-memory repositories with scripted
//! collaborators and a fixed clock, so no database is required. Repository
//! tests that need PostgreSQL use [`test_pool`] and are skipped when
//! `TEST_DATABASE_URL` is unset.

// Helpers are shared by several test binaries and not all of them use every one.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use catalog_guard_api::{
    app::{create_app_with_state, AppState, Repositories},
    config::Config,
    services::Collaborators,
};
use chrono::{DateTime, TimeZone, Utc};
use domain::models::{ProductImage, ProductSnapshot, Shop};
use domain::ports::{
    InMemoryStore, MockCatalogClient, MockNotificationService, MockReportGenerator,
    MockTextGenerator,
};
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use serde_json::Value;
use shared::time::FixedClock;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;
use tower::ServiceExt;

/// Monday 2025-03-10 08:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
}

/// Application under test plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
    pub catalog: MockCatalogClient,
    pub reports: MockReportGenerator,
    pub notifications: MockNotificationService,
    pub clock: Arc<FixedClock>,
}

pub struct TestAppBuilder {
    overrides: Vec<(String, String)>,
    failing_ai: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            failing_ai: false,
        }
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.overrides.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_failing_ai(mut self) -> Self {
        self.failing_ai = true;
        self
    }

    pub fn build(self) -> TestApp {
        let overrides: Vec<(&str, &str)> = self
            .overrides
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let config = Config::load_for_test(&overrides).expect("Failed to load test config");

        let store = InMemoryStore::new();
        let catalog = MockCatalogClient::new();
        let reports = MockReportGenerator::default();
        let notifications = MockNotificationService::new();
        let clock = Arc::new(FixedClock::new(test_now()));
        let text_generator = if self.failing_ai {
            MockTextGenerator::failing()
        } else {
            MockTextGenerator::new()
        };

        let collaborators = Collaborators {
            catalog: Arc::new(catalog.clone()),
            reports: Arc::new(reports.clone()),
            text_generator: Arc::new(text_generator),
            notifications: Arc::new(notifications.clone()),
        };

        let state = AppState::new(
            config,
            None,
            Repositories::in_memory(&store),
            collaborators,
            clock.clone(),
        );

        TestApp {
            router: create_app_with_state(state),
            store,
            catalog,
            reports,
            notifications,
            clock,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        TestAppBuilder::new().build()
    }

    /// Seeds a shop with a random owner email.
    pub async fn create_shop(&self) -> Shop {
        let email: String = SafeEmail().fake();
        let shop = Shop {
            id: uuid::Uuid::new_v4(),
            domain: format!("{}.myshopify.com", uuid::Uuid::new_v4().simple()),
            email: Some(email),
            created_at: test_now(),
        };
        self.store.insert_shop(shop.clone()).await;
        shop
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, parse_body(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::GET, uri)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::DELETE, uri)).await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::POST, uri)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PUT, uri, body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PATCH, uri, body)).await
    }
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Parse a response body as JSON. Empty bodies become `Value::Null`.
pub async fn parse_body(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

/// A snapshot that passes every built-in check.
pub fn clean_snapshot() -> ProductSnapshot {
    ProductSnapshot {
        title: "Organic cotton t-shirt".to_string(),
        seo_title: "Organic cotton t-shirt in five colors".to_string(),
        seo_description: "Soft, breathable organic cotton t-shirt available in five colors."
            .to_string(),
        description: "A soft, breathable t-shirt made from certified organic cotton.".to_string(),
        images: (1..=3)
            .map(|i| ProductImage {
                url: format!("https://cdn.example.com/tshirt-{}.jpg", i),
                alt_text: Some(format!("T-shirt view {}", i)),
            })
            .collect(),
        tags: vec!["cotton".to_string(), "featured".to_string()],
        collections: vec!["summer".to_string()],
    }
}

pub fn shop_uri(shop: &Shop, path: &str) -> String {
    format!("/api/v1/shops/{}{}", shop.id, path)
}

/// Connects to `TEST_DATABASE_URL` and applies migrations.
///
/// Returns `None` when the variable is unset so the suite still runs without
/// a database.
pub async fn test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Inserts a shop row with a unique domain and returns its id.
pub async fn insert_test_shop(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO shops (id, domain, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("shop-{}.example.com", id.simple()))
        .bind(SafeEmail().fake::<String>())
        .execute(pool)
        .await
        .expect("Failed to insert test shop");
    id
}
