#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use carequeue_server::config::AppConfig;
use carequeue_server::notifications::LogMailer;
use carequeue_server::store::MemoryStore;
use carequeue_server::{create_app, CareQueueServer};

pub struct TestApp {
    pub router: Router,
    pub server: CareQueueServer,
}

/// Router over a fresh in-memory store, with email disabled and cheap hashing
pub fn test_app() -> TestApp {
    let mut config = AppConfig::default();
    config.auth.password_memory_kib = 1024;
    config.auth.password_iterations = 1;

    let server = CareQueueServer::with_store(config, Arc::new(MemoryStore::new()), Arc::new(LogMailer))
        .expect("test server");
    TestApp {
        router: create_app(server.clone()),
        server,
    }
}

pub fn tomorrow() -> NaiveDate {
    chrono::Local::now().date_naive() + Duration::days(1)
}

pub async fn send(app: &TestApp, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(app: &TestApp, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub struct Registered {
    pub token: String,
    pub hospital_id: String,
}

pub async fn register_hospital(app: &TestApp, name: &str, admin_email: &str) -> Registered {
    let (status, body) = post(
        app,
        "/api/v1/hospitals/register",
        None,
        json!({
            "name": name,
            "admin_name": "Meera Iyer",
            "admin_email": admin_email,
            "admin_password": "clinic2026"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    Registered {
        token: body["data"]["token"]["access_token"].as_str().expect("token").to_string(),
        hospital_id: body["data"]["hospital"]["id"].as_str().expect("hospital id").to_string(),
    }
}

pub struct CreatedDoctor {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub temporary_password: String,
}

pub async fn create_doctor(app: &TestApp, admin_token: &str, name: &str, email: &str, extra: Value) -> CreatedDoctor {
    let mut payload = json!({ "name": name, "email": email });
    if let (Some(target), Some(fields)) = (payload.as_object_mut(), extra.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    let (status, body) = post(app, "/api/v1/doctors", Some(admin_token), payload).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    CreatedDoctor {
        id: body["data"]["doctor"]["id"].as_str().expect("doctor id").to_string(),
        user_id: body["data"]["user"]["id"].as_str().expect("user id").to_string(),
        email: email.to_string(),
        temporary_password: body["data"]["temporary_password"]
            .as_str()
            .expect("temporary password")
            .to_string(),
    }
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    post(app, "/api/v1/auth/login", None, json!({ "email": email, "password": password })).await
}

pub async fn login_token(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = login(app, email, password).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["token"]["access_token"].as_str().expect("token").to_string()
}

pub fn booking(doctor_id: &str, date: NaiveDate, slot: &str, patient_name: &str, phone: &str) -> Value {
    json!({
        "doctor_id": doctor_id,
        "appointment_date": date.to_string(),
        "time_slot": slot,
        "patient": { "name": patient_name, "phone": phone }
    })
}
