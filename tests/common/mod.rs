//! In-process test harness: a router over a temp-dir database, a clock frozen
//! on `TODAY` and three users with live tokens.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use roombook::auth::{issue_token, register_user};
use roombook::clock::FixedClock;
use roombook::palette::DefaultPalette;
use roombook::server::{AppState, create_router};
use roombook::store::{SqliteStore, Store};
use roombook::types::Role;

pub const TODAY: &str = "2030-05-01";
pub const TOMORROW: &str = "2030-05-02";
pub const YESTERDAY: &str = "2030-04-30";

pub struct TestApp {
    _temp_dir: TempDir,
    router: Router,
    pub admin_token: String,
    pub alice_token: String,
    pub bob_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("roombook.db")).expect("open store");
        store.initialize().expect("initialize store");

        let admin_token = seed_user(&store, "Admin", "admin@school.test", Role::Admin);
        let alice_token = seed_user(&store, "Alice", "alice@school.test", Role::User);
        let bob_token = seed_user(&store, "Bob", "bob@school.test", Role::User);

        let today = NaiveDate::parse_from_str(TODAY, "%Y-%m-%d").expect("valid date");
        let state = Arc::new(AppState::new(
            Arc::new(store),
            Arc::new(FixedClock::on(today)),
            Arc::new(DefaultPalette),
        ));

        Self {
            _temp_dir: temp_dir,
            router: create_router(state),
            admin_token,
            alice_token,
            bob_token,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(Method::GET, uri, token, None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self.send(Method::POST, uri, Some(token), Some(body)).await;
        (status, body)
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self.send(Method::PUT, uri, Some(token), Some(body)).await;
        (status, body)
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self.send(Method::PATCH, uri, Some(token), Some(body)).await;
        (status, body)
    }

    pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        self.send(Method::DELETE, uri, Some(token), None).await.0
    }

    pub async fn create_room(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/admin/rooms",
                &self.admin_token,
                json!({ "name": name, "capacity": 30, "facilities": "Projector" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create room: {body}");
        id_of(&body)
    }

    pub async fn create_slot(&self, start: &str, end: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/admin/time-slots",
                &self.admin_token,
                json!({ "start_time": start, "end_time": end }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create time slot: {body}");
        id_of(&body)
    }

    pub async fn request_booking(
        &self,
        token: &str,
        room_id: &str,
        slot_id: &str,
        date: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/v1/bookings",
            token,
            json!({
                "room_id": room_id,
                "time_slot_id": slot_id,
                "booking_date": date,
                "keperluan": "class",
                "subject": "Algorithms",
                "instructor": "Dr. Lee",
            }),
        )
        .await
    }

    /// Creates a pending booking and returns its id.
    pub async fn book(&self, token: &str, room_id: &str, slot_id: &str, date: &str) -> String {
        let (status, body) = self.request_booking(token, room_id, slot_id, date).await;
        assert_eq!(status, StatusCode::CREATED, "create booking: {body}");
        id_of(&body)
    }

    pub async fn approve(&self, booking_id: &str) -> (StatusCode, Value) {
        self.post(
            &format!("/api/v1/admin/bookings/{booking_id}/approve"),
            &self.admin_token,
            json!({}),
        )
        .await
    }
}

fn seed_user(store: &SqliteStore, name: &str, email: &str, role: Role) -> String {
    let user = register_user(store, name, email, role).expect("register user");
    let (_, raw) = issue_token(store, &user.id, None).expect("issue token");
    raw
}

pub fn id_of(body: &Value) -> String {
    body["data"]["id"]
        .as_str()
        .unwrap_or_else(|| panic!("no data.id in {body}"))
        .to_string()
}
