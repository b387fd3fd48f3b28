//! Repository traits and their backends
//!
//! Every lookup takes the caller's hospital id; a record owned by another
//! hospital is reported exactly like a missing one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use booking_engine::{AppointmentStatus, BookingError, BookingPolicy};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentFilter, Attendance, Doctor, DoctorLeave, DoctorUpdate, Hospital, HospitalUpdate,
    NewBooking, NewDoctor, NewHospital, NewLeave, NewPatient, NewUser, Patient, PatientUpdate, Role, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stored record is invalid: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Window into a list, from `PaginationParams`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

impl PageRequest {
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait HospitalRepository: Send + Sync {
    /// Create a hospital with its first admin. Fails without side effects if
    /// the admin email is taken.
    async fn register_hospital(&self, hospital: NewHospital, admin: NewUser) -> StoreResult<(Hospital, User)>;
    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>>;
    async fn update_hospital(&self, id: Uuid, update: HospitalUpdate) -> StoreResult<Hospital>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// User and password hash for an email, any case
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<(User, String)>>;
    async fn password_hash(&self, user_id: Uuid) -> StoreResult<Option<String>>;
    async fn set_password(&self, user_id: Uuid, password_hash: String, must_change: bool) -> StoreResult<()>;
    async fn list_users(&self, hospital_id: Uuid, role: Option<Role>, page: PageRequest) -> StoreResult<Page<User>>;
    async fn set_user_active(&self, hospital_id: Uuid, user_id: Uuid, active: bool) -> StoreResult<User>;
}

#[async_trait]
pub trait DoctorRepository: Send + Sync {
    /// Create the doctor's login and profile together
    async fn create_doctor(&self, user: NewUser, doctor: NewDoctor) -> StoreResult<(User, Doctor)>;
    /// Look up by doctor id or by the doctor's user id
    async fn find_doctor(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Doctor>>;
    async fn list_doctors(&self, hospital_id: Uuid, active: Option<bool>, page: PageRequest) -> StoreResult<Page<Doctor>>;
    async fn hospital_doctors(&self, hospital_id: Uuid) -> StoreResult<Vec<Doctor>>;
    async fn update_doctor(&self, hospital_id: Uuid, doctor_id: Uuid, update: DoctorUpdate) -> StoreResult<Doctor>;
    /// Deactivate the profile and its user account
    async fn deactivate_doctor(&self, hospital_id: Uuid, doctor_id: Uuid) -> StoreResult<Doctor>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn create_patient(&self, hospital_id: Uuid, patient: NewPatient) -> StoreResult<Patient>;
    async fn get_patient(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn search_patients(&self, hospital_id: Uuid, search: Option<&str>, page: PageRequest) -> StoreResult<Page<Patient>>;
    async fn update_patient(&self, hospital_id: Uuid, id: Uuid, update: PatientUpdate) -> StoreResult<Patient>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Re-read the doctor, check leave and capacity, pick the next serial,
    /// then record an inline patient and the appointment. One atomic step
    /// per doctor and day; a rejected booking writes nothing.
    async fn book_appointment(
        &self,
        booking: NewBooking,
        policy: &BookingPolicy,
        today: NaiveDate,
    ) -> StoreResult<(Appointment, Patient)>;
    async fn get_appointment(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn list_appointments(
        &self,
        hospital_id: Uuid,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Appointment>>;
    /// All appointments of a day, cancelled included, ordered by serial
    async fn appointments_for_day(
        &self,
        hospital_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> StoreResult<Vec<Appointment>>;
    /// Apply a lifecycle transition, rejecting ones the lifecycle forbids
    async fn update_appointment_status(
        &self,
        hospital_id: Uuid,
        id: Uuid,
        next: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> StoreResult<Appointment>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn create_leave(&self, leave: NewLeave) -> StoreResult<DoctorLeave>;
    async fn get_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<DoctorLeave>>;
    async fn list_leaves(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<DoctorLeave>>;
    async fn delete_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Open today's record; a second check-in on the same date conflicts
    async fn check_in(&self, hospital_id: Uuid, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance>;
    async fn check_out(&self, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance>;
    async fn list_attendance(
        &self,
        hospital_id: Uuid,
        user_id: Option<Uuid>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<Attendance>>;
}

/// Everything the HTTP layer needs from storage
#[async_trait]
pub trait ClinicStore:
    HospitalRepository
    + UserRepository
    + DoctorRepository
    + PatientRepository
    + AppointmentRepository
    + LeaveRepository
    + AttendanceRepository
{
    /// Short backend name for health output
    fn backend(&self) -> &'static str;
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_slice() {
        let items: Vec<u32> = (1..=45).collect();
        let page = PageRequest { offset: 40, limit: 20 };
        assert_eq!(page.slice(&items), vec![41, 42, 43, 44, 45]);

        let past_end = PageRequest { offset: 100, limit: 20 };
        assert!(past_end.slice(&items).is_empty());
    }
}
