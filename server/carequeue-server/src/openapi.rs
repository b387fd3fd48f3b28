use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::server::CareQueueServer;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,

        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,

        crate::handlers::hospitals::register_hospital,
        crate::handlers::hospitals::get_hospital,
        crate::handlers::hospitals::update_hospital,

        crate::handlers::doctors::create_doctor,
        crate::handlers::doctors::list_doctors,
        crate::handlers::doctors::get_doctor,
        crate::handlers::doctors::update_doctor,
        crate::handlers::doctors::deactivate_doctor,
        crate::handlers::doctors::doctor_availability,
        crate::handlers::doctors::create_leave,
        crate::handlers::doctors::list_leaves,
        crate::handlers::leaves::delete_leave,

        crate::handlers::staff::create_staff,
        crate::handlers::staff::list_staff,
        crate::handlers::staff::deactivate_staff,

        crate::handlers::patients::create_patient,
        crate::handlers::patients::list_patients,
        crate::handlers::patients::get_patient,
        crate::handlers::patients::update_patient,

        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::update_status,
        crate::handlers::appointments::cancel_appointment,

        crate::handlers::queue::hospital_queue,
        crate::handlers::queue::public_queue,

        crate::handlers::attendance::check_in,
        crate::handlers::attendance::check_out,
        crate::handlers::attendance::my_attendance,
        crate::handlers::attendance::list_attendance,
    ),
    components(
        schemas(
            crate::error::ApiErrorResponse,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::VersionResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::auth::MessageResponse,
            crate::auth::IssuedToken,
            crate::models::Hospital,
            crate::models::HospitalUpdate,
            crate::models::User,
            crate::models::Role,
            crate::models::Doctor,
            crate::models::DoctorUpdate,
            crate::models::Patient,
            crate::models::NewPatient,
            crate::models::PatientUpdate,
            crate::models::Appointment,
            crate::models::DoctorLeave,
            crate::models::Attendance,
            crate::models::AttendanceStatus,
            crate::services::RegisterHospitalRequest,
            crate::services::HospitalRegistration,
            crate::services::CreateDoctorRequest,
            crate::services::CreateStaffRequest,
            crate::services::OnboardedUser,
            crate::services::CreateAppointmentRequest,
            crate::services::CreateLeaveRequest,
            crate::services::LeaveCreated,
            crate::handlers::appointments::UpdateStatusRequest,
            crate::handlers::appointments::CancelAppointmentRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Login and password management"),
        (name = "hospitals", description = "Hospital registration and profile"),
        (name = "doctors", description = "Doctor onboarding, profiles and availability"),
        (name = "staff", description = "Front desk and other staff accounts"),
        (name = "patients", description = "Patient records"),
        (name = "appointments", description = "Booking, tokens and status lifecycle"),
        (name = "queue", description = "Daily token queue"),
        (name = "attendance", description = "Staff check-in and check-out"),
        (name = "leaves", description = "Doctor leave and slot blocking"),
    ),
    info(
        title = "CareQueue API",
        description = "Clinic appointments, daily token queues and staff management.",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`
pub fn create_docs_routes() -> Router<CareQueueServer> {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_booking_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/appointments"));
        assert!(doc.paths.paths.contains_key("/api/v1/public/hospitals/{hospital_id}/queue"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|components| components.security_schemes.contains_key("bearer_auth")));
    }
}
