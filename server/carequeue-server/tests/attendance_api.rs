mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_check_in_and_out_once_per_day() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;
    let doctor_token = login_token(&app, &doctor.email, &doctor.temporary_password).await;

    let (status, _) = post(&app, "/api/v1/attendance/check-out", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, checked_in) = post(&app, "/api/v1/attendance/check-in", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{checked_in}");
    assert!(checked_in["data"]["check_out"].is_null());

    let (status, again) = post(&app, "/api/v1/attendance/check-in", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error_type"], "conflict");

    // Checking out minutes later is well under four hours
    let (status, checked_out) = post(&app, "/api/v1/attendance/check-out", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{checked_out}");
    assert_eq!(checked_out["data"]["status"], "half_day");
    assert!(!checked_out["data"]["check_out"].is_null());

    let (status, _) = post(&app, "/api/v1/attendance/check-out", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, mine) = get(&app, "/api/v1/attendance/me", Some(&doctor_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_hospital_attendance_is_admin_only() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;
    let doctor_token = login_token(&app, &doctor.email, &doctor.temporary_password).await;

    let (status, _) = post(&app, "/api/v1/attendance/check-in", Some(&doctor_token), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&app, "/api/v1/attendance/check-in", Some(&admin.token), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = get(&app, "/api/v1/attendance", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);

    let (status, filtered) = get(
        &app,
        &format!("/api/v1/attendance?user_id={}", doctor.user_id),
        Some(&admin.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);

    let (status, forbidden) = get(&app, "/api/v1/attendance", Some(&doctor_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden["error_type"], "authorization_error");
}
