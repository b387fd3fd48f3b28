pub mod paths;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers::{appointments, attendance, auth, doctors, health, hospitals, leaves, patients, queue, staff},
    openapi,
    server::CareQueueServer,
};
use paths::api_v1;

/// Health check routes (no authentication)
pub fn health_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

pub fn auth_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::AUTH_LOGIN, post(auth::login))
        .route(api_v1::AUTH_ME, get(auth::me))
        .route(api_v1::AUTH_CHANGE_PASSWORD, post(auth::change_password))
}

pub fn hospital_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::HOSPITALS_REGISTER, post(hospitals::register_hospital))
        .route(
            api_v1::HOSPITAL,
            get(hospitals::get_hospital).put(hospitals::update_hospital),
        )
}

pub fn doctor_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::DOCTORS, post(doctors::create_doctor).get(doctors::list_doctors))
        .route(
            api_v1::DOCTOR_BY_ID,
            get(doctors::get_doctor)
                .put(doctors::update_doctor)
                .delete(doctors::deactivate_doctor),
        )
        .route(api_v1::DOCTOR_AVAILABILITY, get(doctors::doctor_availability))
        .route(api_v1::DOCTOR_LEAVES, post(doctors::create_leave).get(doctors::list_leaves))
        .route(api_v1::LEAVE_BY_ID, delete(leaves::delete_leave))
}

pub fn staff_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::STAFF, post(staff::create_staff).get(staff::list_staff))
        .route(api_v1::STAFF_BY_ID, delete(staff::deactivate_staff))
}

pub fn patient_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::PATIENTS, post(patients::create_patient).get(patients::list_patients))
        .route(
            api_v1::PATIENT_BY_ID,
            get(patients::get_patient).put(patients::update_patient),
        )
}

pub fn appointment_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(
            api_v1::APPOINTMENTS,
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route(api_v1::APPOINTMENT_BY_ID, get(appointments::get_appointment))
        .route(api_v1::APPOINTMENT_STATUS, put(appointments::update_status))
        .route(api_v1::APPOINTMENT_CANCEL, post(appointments::cancel_appointment))
}

pub fn queue_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::QUEUE, get(queue::hospital_queue))
        .route(api_v1::PUBLIC_QUEUE, get(queue::public_queue))
}

pub fn attendance_routes() -> Router<CareQueueServer> {
    Router::new()
        .route(api_v1::ATTENDANCE, get(attendance::list_attendance))
        .route(api_v1::ATTENDANCE_CHECK_IN, post(attendance::check_in))
        .route(api_v1::ATTENDANCE_CHECK_OUT, post(attendance::check_out))
        .route(api_v1::ATTENDANCE_ME, get(attendance::my_attendance))
}

pub fn api_v1_routes() -> Router<CareQueueServer> {
    Router::new()
        .merge(auth_routes())
        .merge(hospital_routes())
        .merge(doctor_routes())
        .merge(staff_routes())
        .merge(patient_routes())
        .merge(appointment_routes())
        .merge(queue_routes())
        .merge(attendance_routes())
}

pub fn create_routes() -> Router<CareQueueServer> {
    Router::new()
        .merge(health_routes())
        .merge(openapi::create_docs_routes())
        .nest(paths::API_V1, api_v1_routes())
}
