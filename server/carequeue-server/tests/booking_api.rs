mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_tokens_are_sequential_and_never_reused() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;
    let date = tomorrow();
    let prefix = format!("{}-AR-", date.format("%Y%m%d"));

    let (status, first) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "10:30", "Kiran Shah", "98450 12345"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["data"]["token"], format!("{prefix}001"));
    assert_eq!(first["data"]["status"], "booked");

    // Booking through the doctor's user id and a differently formatted phone reuses the patient
    let (status, second) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.user_id, date, "11:00", "Kiran Shah", "98450-12345"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{second}");
    assert_eq!(second["data"]["token"], format!("{prefix}002"));
    assert_eq!(second["data"]["patient_id"], first["data"]["patient_id"]);

    let first_id = first["data"]["id"].as_str().unwrap();
    let (status, cancelled) = post(
        &app,
        &format!("/api/v1/appointments/{first_id}/cancel"),
        Some(&admin.token),
        json!({ "reason": "patient travelling" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["data"]["status"], "cancelled");
    assert_eq!(cancelled["data"]["cancellation_reason"], "patient travelling");

    let (status, third) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "10:30", "Ravi Kumar", "9900011122"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{third}");
    assert_eq!(third["data"]["token"], format!("{prefix}003"));
}

#[tokio::test]
async fn test_slot_capacity_and_leave_rejections() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(
        &app,
        &admin.token,
        "Dr. Asha Rao",
        "asha@citycare.test",
        json!({ "slot_capacity": 1, "consultation_slots": ["09:00", "09:30"] }),
    )
    .await;
    let date = tomorrow();

    let (status, _) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "09:00", "Kiran Shah", "9845012345"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, full) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "09:00", "Ravi Kumar", "9900011122"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(full["error_type"], "slot_full");

    let (status, not_offered) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "14:00", "Ravi Kumar", "9900011122"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(not_offered["error_type"], "slot_not_offered");

    // The doctor blocks 09:30 themselves; the existing 09:00 booking is untouched
    let doctor_token = login_token(&app, &doctor.email, &doctor.temporary_password).await;
    let (status, leave) = post(
        &app,
        &format!("/api/v1/doctors/{}/leaves", doctor.id),
        Some(&doctor_token),
        json!({ "date": date.to_string(), "blocked_slots": ["09:30"], "reason": "ward round" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{leave}");
    assert_eq!(leave["data"]["overlapping_appointments"], 0);

    let (status, blocked) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "09:30", "Ravi Kumar", "9900011122"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(blocked["error_type"], "slot_blocked");

    let (status, availability) = get(
        &app,
        &format!("/api/v1/doctors/{}/availability?date={}", doctor.id, date),
        Some(&admin.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let slots = availability["data"]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["slot"], "09:00");
    assert_eq!(slots[0]["remaining"], 0);
    assert_eq!(slots[1]["blocked"], true);
    assert_eq!(availability["data"]["full_day_blocked"], false);

    // Full-day leave on top
    let (status, _) = post(
        &app,
        &format!("/api/v1/doctors/{}/leaves", doctor.id),
        Some(&admin.token),
        json!({ "date": date.to_string() }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, on_leave) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, date, "09:00", "Ravi Kumar", "9900011122"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(on_leave["error_type"], "doctor_on_leave");

    // None of the rejected bookings registered the walk-in
    let (status, patients) = get(&app, "/api/v1/patients?search=9900011122", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patients["metadata"]["total_count"], 0);
}

#[tokio::test]
async fn test_input_rejections() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;

    let yesterday = chrono::Local::now().date_naive() - chrono::Duration::days(1);
    let (status, past) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, yesterday, "10:00", "Kiran Shah", "9845012345"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(past["error_type"], "past_date");

    let (status, bad_slot) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&doctor.id, tomorrow(), "quarter past", "Kiran Shah", "9845012345"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_slot["error_type"], "invalid_slot");

    let (status, missing_patient) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        json!({ "doctor_id": doctor.id, "appointment_date": tomorrow().to_string(), "time_slot": "10:00" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_patient["error_type"], "validation_error");

    let (status, unknown_doctor) = post(
        &app,
        "/api/v1/appointments",
        Some(&admin.token),
        booking(&uuid::Uuid::new_v4().to_string(), tomorrow(), "10:00", "Kiran Shah", "9845012345"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_doctor["error_type"], "doctor_not_found");
}

#[tokio::test]
async fn test_concurrent_bookings_get_distinct_serials() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(
        &app,
        &admin.token,
        "Dr. Asha Rao",
        "asha@citycare.test",
        json!({ "slot_capacity": 10 }),
    )
    .await;
    let date = tomorrow();

    let app = std::sync::Arc::new(app);
    let mut handles = Vec::new();
    for i in 0..12 {
        let app = app.clone();
        let token = admin.token.clone();
        let doctor_id = doctor.id.clone();
        handles.push(tokio::spawn(async move {
            post(
                &app,
                "/api/v1/appointments",
                Some(&token),
                booking(&doctor_id, date, "10:00", "Walk In", &format!("98450{:05}", i)),
            )
            .await
        }));
    }

    let mut serials = Vec::new();
    let mut rejected = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        match status {
            StatusCode::CREATED => serials.push(body["data"]["token_serial"].as_u64().unwrap()),
            StatusCode::CONFLICT => {
                assert_eq!(body["error_type"], "slot_full");
                rejected += 1;
            }
            other => panic!("unexpected status {other}: {body}"),
        }
    }
    serials.sort_unstable();
    assert_eq!(serials, (1..=10).collect::<Vec<u64>>());
    assert_eq!(rejected, 2);
}

#[tokio::test]
async fn test_status_lifecycle_and_queue() {
    let app = test_app();
    let admin = register_hospital(&app, "City Care Clinic", "meera@citycare.test").await;
    let doctor = create_doctor(&app, &admin.token, "Dr. Asha Rao", "asha@citycare.test", json!({})).await;
    let date = tomorrow();

    let mut ids = Vec::new();
    for (name, phone) in [("Kiran Shah", "9845012345"), ("Ravi Kumar", "9900011122"), ("Anita Das", "9811122233")] {
        let (status, body) = post(
            &app,
            "/api/v1/appointments",
            Some(&admin.token),
            booking(&doctor.id, date, "10:00", name, phone),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let status_uri = |id: &str| format!("/api/v1/appointments/{id}/status");
    for next in ["checked_in", "in_consultation"] {
        let (status, body) = send(
            &app,
            Method::PUT,
            &status_uri(&ids[0]),
            Some(&admin.token),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    // Skipping straight to completed from booked is not allowed
    let (status, invalid) = send(
        &app,
        Method::PUT,
        &status_uri(&ids[1]),
        Some(&admin.token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(invalid["error_type"], "invalid_transition");

    let (status, _) = post(
        &app,
        &format!("/api/v1/appointments/{}/cancel", ids[2]),
        Some(&admin.token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, queue) = get(&app, &format!("/api/v1/queue?date={date}"), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    let doctor_queue = &queue["data"]["doctors"][0];
    assert_eq!(doctor_queue["total"], 2);
    assert_eq!(doctor_queue["waiting"], 1);
    assert_eq!(doctor_queue["now_serving"]["patient_name"], "Kiran Shah");
    assert_eq!(doctor_queue["next_up"]["patient_name"], "Ravi Kumar");
    assert_eq!(doctor_queue["entries"][1]["position"], 2);

    let (status, public) = get(
        &app,
        &format!("/api/v1/public/hospitals/{}/queue?date={date}", admin.hospital_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["data"]["doctors"][0]["now_serving"]["patient_name"], "Kiran S.");
    assert_eq!(public["data"]["doctors"][0]["entries"][1]["patient_name"], "Ravi K.");

    let (status, listed) = get(
        &app,
        &format!("/api/v1/appointments?date={date}&status=cancelled"),
        Some(&admin.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["metadata"]["total_count"], 1);

    let (status, _) = get(&app, "/api/v1/appointments?status=finished", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
