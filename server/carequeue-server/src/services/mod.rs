//! Operations that span several repositories or talk to the mailer

pub mod booking;
pub mod onboarding;

pub use booking::{BookingService, CreateAppointmentRequest, CreateLeaveRequest, LeaveCreated};
pub use onboarding::{
    CreateDoctorRequest, CreateStaffRequest, HospitalRegistration, OnboardedUser, OnboardingService,
    RegisterHospitalRequest,
};
