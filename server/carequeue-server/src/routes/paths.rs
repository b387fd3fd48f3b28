//! Route paths in axum syntax

pub const API_V1: &str = "/api/v1";

pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

/// Relative to [`super::API_V1`]
pub mod api_v1 {
    pub const AUTH_LOGIN: &str = "/auth/login";
    pub const AUTH_ME: &str = "/auth/me";
    pub const AUTH_CHANGE_PASSWORD: &str = "/auth/change-password";

    pub const HOSPITALS_REGISTER: &str = "/hospitals/register";
    pub const HOSPITAL: &str = "/hospital";

    pub const DOCTORS: &str = "/doctors";
    pub const DOCTOR_BY_ID: &str = "/doctors/:id";
    pub const DOCTOR_AVAILABILITY: &str = "/doctors/:id/availability";
    pub const DOCTOR_LEAVES: &str = "/doctors/:id/leaves";
    pub const LEAVE_BY_ID: &str = "/leaves/:id";

    pub const STAFF: &str = "/staff";
    pub const STAFF_BY_ID: &str = "/staff/:id";

    pub const PATIENTS: &str = "/patients";
    pub const PATIENT_BY_ID: &str = "/patients/:id";

    pub const APPOINTMENTS: &str = "/appointments";
    pub const APPOINTMENT_BY_ID: &str = "/appointments/:id";
    pub const APPOINTMENT_STATUS: &str = "/appointments/:id/status";
    pub const APPOINTMENT_CANCEL: &str = "/appointments/:id/cancel";

    pub const QUEUE: &str = "/queue";
    pub const PUBLIC_QUEUE: &str = "/public/hospitals/:hospital_id/queue";

    pub const ATTENDANCE: &str = "/attendance";
    pub const ATTENDANCE_CHECK_IN: &str = "/attendance/check-in";
    pub const ATTENDANCE_CHECK_OUT: &str = "/attendance/check-out";
    pub const ATTENDANCE_ME: &str = "/attendance/me";
}
