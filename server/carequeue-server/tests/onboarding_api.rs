mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_health_reports_store_backend() {
    let app = test_app();
    let (status, body) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["store"], "memory");
}

#[tokio::test]
async fn test_registration_and_login() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;

    let (status, hospital) = get(&app, "/api/v1/hospital", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hospital["data"]["code"], "CITYCARE");

    // Email uniqueness ignores case
    let (status, duplicate) = post(
        &app,
        "/api/v1/hospitals/register",
        None,
        json!({
            "name": "Another Clinic",
            "admin_name": "Meera Iyer",
            "admin_email": "Meera@CityCare.test",
            "admin_password": "clinic2026"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(duplicate["error_type"], "conflict");

    let (status, weak) = post(
        &app,
        "/api/v1/hospitals/register",
        None,
        json!({
            "name": "Third Clinic",
            "admin_name": "Sunil Rao",
            "admin_email": "sunil@third.test",
            "admin_password": "short"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(weak["error_type"], "validation_error");

    let (status, wrong) = login(&app, "meera@citycare.test", "clinic2027").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error_type"], "authentication_error");

    let (status, unknown) = login(&app, "nobody@citycare.test", "clinic2026").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error_type"], "authentication_error");

    let token = login_token(&app, "MEERA@citycare.test", "clinic2026").await;
    let (status, me) = get(&app, "/api/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["role"], "hospital_admin");
    assert_eq!(me["data"]["must_change_password"], false);
    assert!(me["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_doctor_must_change_temporary_password() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;

    let (status, session) = login(&app, &doctor.email, &doctor.temporary_password).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["data"]["user"]["role"], "doctor");
    assert_eq!(session["data"]["user"]["must_change_password"], true);
    let token = session["data"]["token"]["access_token"].as_str().unwrap().to_string();

    let (status, wrong_current) = post(
        &app,
        "/api/v1/auth/change-password",
        Some(&token),
        json!({ "current_password": "not-it-123", "new_password": "asha2026clinic" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_current["error_type"], "validation_error");

    let (status, _) = post(
        &app,
        "/api/v1/auth/change-password",
        Some(&token),
        json!({ "current_password": doctor.temporary_password, "new_password": "asha2026clinic" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&app, &doctor.email, &doctor.temporary_password).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, session) = login(&app, &doctor.email, "asha2026clinic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["data"]["user"]["must_change_password"], false);
}

#[tokio::test]
async fn test_role_checks_and_tenant_isolation() {
    let app = test_app();
    let city = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let lake = register_hospital(&app, "Lakeview Hospital", "admin@lakeview.test").await;
    let doctor = create_doctor(&app, &city.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;
    let doctor_token = login_token(&app, &doctor.email, &doctor.temporary_password).await;

    let (status, _) = get(&app, "/api/v1/doctors", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/api/v1/doctors", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, forbidden) = post(
        &app,
        "/api/v1/staff",
        Some(&doctor_token),
        json!({ "name": "Priya Nair", "email": "priya@citycare.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden["error_type"], "authorization_error");

    // Another hospital cannot see this doctor
    let (status, _) = get(&app, &format!("/api/v1/doctors/{}", doctor.id), Some(&lake.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, &format!("/api/v1/doctors/{}", doctor.id), Some(&city.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = get(&app, "/api/v1/doctors", Some(&lake.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);

    let (status, _) = get(
        &app,
        &format!("/api/v1/public/hospitals/{}/queue", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_lifecycle() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;

    let (status, created) = post(
        &app,
        "/api/v1/staff",
        Some(&admin.token),
        json!({ "name": "Priya Nair", "email": "priya@citycare.test", "designation": "Receptionist" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["data"]["user"]["role"], "staff");
    assert_eq!(created["data"]["credentials_emailed"], false);
    let staff_id = created["data"]["user"]["id"].as_str().unwrap().to_string();
    let password = created["data"]["temporary_password"].as_str().unwrap().to_string();

    let staff_token = login_token(&app, "priya@citycare.test", &password).await;
    let (status, _) = get(&app, "/api/v1/patients", Some(&staff_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = get(&app, "/api/v1/staff", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["metadata"]["total_count"], 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/staff/{staff_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The old token stops working once the account is deactivated
    let (status, _) = get(&app, "/api/v1/patients", Some(&staff_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "priya@citycare.test", &password).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
