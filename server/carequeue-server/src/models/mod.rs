//! Records stored by CareQueue and the inputs used to create or change them

pub mod appointment;
pub mod attendance;
pub mod doctor;
pub mod hospital;
pub mod leave;
pub mod patient;
pub mod user;

pub use appointment::{Appointment, AppointmentFilter, BookingDraft, BookingPatient, NewBooking};
pub use attendance::{Attendance, AttendanceStatus};
pub use doctor::{Doctor, DoctorUpdate, NewDoctor};
pub use hospital::{Hospital, HospitalUpdate, NewHospital};
pub use leave::{DoctorLeave, NewLeave};
pub use patient::{NewPatient, Patient, PatientUpdate};
pub use user::{NewUser, Role, User};
