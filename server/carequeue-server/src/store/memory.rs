//! In-process store for development and tests
//!
//! All tables sit behind one lock, so a booking holds the write lock from
//! the leave and capacity checks through the insert.

use async_trait::async_trait;
use booking_engine::{plan_booking, AppointmentStatus, BookingError, BookingPolicy, SlotSnapshot, TimeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{
    AppointmentRepository, AttendanceRepository, ClinicStore, DoctorRepository, HospitalRepository, LeaveRepository,
    Page, PageRequest, PatientRepository, StoreError, StoreResult, UserRepository,
};
use crate::models::hospital::{hospital_code_base, next_free_code};
use crate::models::patient::normalize_phone;
use crate::models::user::normalize_email;
use crate::models::{
    Appointment, AppointmentFilter, Attendance, BookingPatient, Doctor, DoctorLeave, DoctorUpdate, Hospital,
    HospitalUpdate, NewBooking, NewDoctor, NewHospital, NewLeave, NewPatient, NewUser, Patient, PatientUpdate, Role,
    User,
};

struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    hospitals: HashMap<Uuid, Hospital>,
    users: HashMap<Uuid, UserRecord>,
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
    leaves: HashMap<Uuid, DoctorLeave>,
    attendance: HashMap<Uuid, Attendance>,
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.users.values().any(|record| record.user.email == email)
    }

    fn insert_user(&mut self, new: NewUser) -> StoreResult<User> {
        if self.email_taken(&new.email) {
            return Err(StoreError::Conflict(format!(
                "A user with email {} already exists",
                normalize_email(&new.email)
            )));
        }
        let (user, password_hash) = User::from_new(new);
        self.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    fn phone_owner(&self, hospital_id: Uuid, phone: &str) -> Option<&Patient> {
        let phone = normalize_phone(phone);
        self.patients
            .values()
            .find(|patient| patient.hospital_id == hospital_id && patient.phone == phone)
    }

    fn find_or_insert_patient(&mut self, hospital_id: Uuid, new: NewPatient) -> Patient {
        if let Some(existing) = self.phone_owner(hospital_id, &new.phone) {
            return existing.clone();
        }
        let patient = Patient::from_new(hospital_id, new);
        self.patients.insert(patient.id, patient.clone());
        patient
    }

    fn doctor_mut(&mut self, hospital_id: Uuid, id: Uuid) -> StoreResult<&mut Doctor> {
        self.doctors
            .values_mut()
            .find(|doctor| doctor.hospital_id == hospital_id && doctor.matches(id))
            .ok_or(StoreError::NotFound("Doctor"))
    }

    fn snapshot(&self, doctor_id: Uuid, date: NaiveDate, slot: TimeSlot) -> SlotSnapshot {
        let day: Vec<&Appointment> = self
            .appointments
            .values()
            .filter(|appt| appt.doctor_id == doctor_id && appt.appointment_date == date)
            .collect();

        let active_in_slot = day
            .iter()
            .filter(|appt| appt.time_slot == slot && appt.status.is_active())
            .count();

        SlotSnapshot {
            leaves: self
                .leaves
                .values()
                .filter(|leave| leave.doctor_id == doctor_id && leave.date == date)
                .map(DoctorLeave::block)
                .collect(),
            active_in_slot: u32::try_from(active_in_slot).unwrap_or(u32::MAX),
            max_serial: day.iter().map(|appt| appt.token_serial).max(),
        }
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    Page {
        total: i64::try_from(items.len()).unwrap_or(i64::MAX),
        items: page.slice(&items),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HospitalRepository for MemoryStore {
    async fn register_hospital(&self, hospital: NewHospital, admin: NewUser) -> StoreResult<(Hospital, User)> {
        let mut tables = self.tables.write();
        if tables.email_taken(&admin.email) {
            return Err(StoreError::Conflict(format!(
                "A user with email {} already exists",
                normalize_email(&admin.email)
            )));
        }

        let taken: HashSet<String> = tables.hospitals.values().map(|h| h.code.clone()).collect();
        let code = next_free_code(&hospital_code_base(&hospital.name), &taken);
        let hospital = Hospital::from_new(hospital, code);
        tables.hospitals.insert(hospital.id, hospital.clone());

        let admin = tables.insert_user(NewUser {
            hospital_id: hospital.id,
            ..admin
        })?;
        Ok((hospital, admin))
    }

    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>> {
        Ok(self.tables.read().hospitals.get(&id).cloned())
    }

    async fn update_hospital(&self, id: Uuid, update: HospitalUpdate) -> StoreResult<Hospital> {
        let mut tables = self.tables.write();
        let hospital = tables.hospitals.get_mut(&id).ok_or(StoreError::NotFound("Hospital"))?;
        hospital.apply(update);
        Ok(hospital.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.tables.write().insert_user(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).map(|record| record.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<(User, String)>> {
        let email = normalize_email(email);
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|record| record.user.email == email)
            .map(|record| (record.user.clone(), record.password_hash.clone())))
    }

    async fn password_hash(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        Ok(self
            .tables
            .read()
            .users
            .get(&user_id)
            .map(|record| record.password_hash.clone()))
    }

    async fn set_password(&self, user_id: Uuid, password_hash: String, must_change: bool) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let record = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound("User"))?;
        record.password_hash = password_hash;
        record.user.must_change_password = must_change;
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_users(&self, hospital_id: Uuid, role: Option<Role>, page: PageRequest) -> StoreResult<Page<User>> {
        let mut users: Vec<User> = self
            .tables
            .read()
            .users
            .values()
            .map(|record| &record.user)
            .filter(|user| user.hospital_id == hospital_id && role.map_or(true, |r| user.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(page_of(users, page))
    }

    async fn set_user_active(&self, hospital_id: Uuid, user_id: Uuid, active: bool) -> StoreResult<User> {
        let mut tables = self.tables.write();
        let record = tables
            .users
            .get_mut(&user_id)
            .filter(|record| record.user.hospital_id == hospital_id)
            .ok_or(StoreError::NotFound("User"))?;
        record.user.is_active = active;
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }
}

#[async_trait]
impl DoctorRepository for MemoryStore {
    async fn create_doctor(&self, user: NewUser, doctor: NewDoctor) -> StoreResult<(User, Doctor)> {
        let mut tables = self.tables.write();
        let user = tables.insert_user(user)?;
        let doctor = Doctor::from_new(user.hospital_id, user.id, user.name.clone(), doctor);
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok((user, doctor))
    }

    async fn find_doctor(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self
            .tables
            .read()
            .doctors
            .values()
            .find(|doctor| doctor.hospital_id == hospital_id && doctor.matches(id))
            .cloned())
    }

    async fn list_doctors(&self, hospital_id: Uuid, active: Option<bool>, page: PageRequest) -> StoreResult<Page<Doctor>> {
        let mut doctors: Vec<Doctor> = self
            .tables
            .read()
            .doctors
            .values()
            .filter(|doctor| doctor.hospital_id == hospital_id && active.map_or(true, |a| doctor.is_active == a))
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(page_of(doctors, page))
    }

    async fn hospital_doctors(&self, hospital_id: Uuid) -> StoreResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self
            .tables
            .read()
            .doctors
            .values()
            .filter(|doctor| doctor.hospital_id == hospital_id)
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn update_doctor(&self, hospital_id: Uuid, doctor_id: Uuid, update: DoctorUpdate) -> StoreResult<Doctor> {
        let mut tables = self.tables.write();
        let doctor = tables.doctor_mut(hospital_id, doctor_id)?;
        doctor.apply(update);
        Ok(doctor.clone())
    }

    async fn deactivate_doctor(&self, hospital_id: Uuid, doctor_id: Uuid) -> StoreResult<Doctor> {
        let mut tables = self.tables.write();
        let doctor = tables.doctor_mut(hospital_id, doctor_id)?;
        doctor.is_active = false;
        doctor.updated_at = Utc::now();
        let doctor = doctor.clone();

        if let Some(record) = tables.users.get_mut(&doctor.user_id) {
            record.user.is_active = false;
            record.user.updated_at = doctor.updated_at;
        }
        Ok(doctor)
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn create_patient(&self, hospital_id: Uuid, patient: NewPatient) -> StoreResult<Patient> {
        let mut tables = self.tables.write();
        if tables.phone_owner(hospital_id, &patient.phone).is_some() {
            return Err(StoreError::Conflict(
                "A patient with this phone number already exists".to_string(),
            ));
        }
        let patient = Patient::from_new(hospital_id, patient);
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self
            .tables
            .read()
            .patients
            .get(&id)
            .filter(|patient| patient.hospital_id == hospital_id)
            .cloned())
    }

    async fn search_patients(&self, hospital_id: Uuid, search: Option<&str>, page: PageRequest) -> StoreResult<Page<Patient>> {
        let mut patients: Vec<Patient> = self
            .tables
            .read()
            .patients
            .values()
            .filter(|patient| patient.hospital_id == hospital_id && search.map_or(true, |s| patient.matches_search(s)))
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(page_of(patients, page))
    }

    async fn update_patient(&self, hospital_id: Uuid, id: Uuid, update: PatientUpdate) -> StoreResult<Patient> {
        let mut tables = self.tables.write();
        if let Some(phone) = update.phone.as_deref() {
            if tables
                .phone_owner(hospital_id, phone)
                .is_some_and(|owner| owner.id != id)
            {
                return Err(StoreError::Conflict(
                    "A patient with this phone number already exists".to_string(),
                ));
            }
        }
        let patient = tables
            .patients
            .get_mut(&id)
            .filter(|patient| patient.hospital_id == hospital_id)
            .ok_or(StoreError::NotFound("Patient"))?;
        patient.apply(update);
        Ok(patient.clone())
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn book_appointment(
        &self,
        booking: NewBooking,
        policy: &BookingPolicy,
        today: NaiveDate,
    ) -> StoreResult<(Appointment, Patient)> {
        let mut tables = self.tables.write();
        let schedule = tables
            .doctors
            .get(&booking.doctor_id)
            .filter(|doctor| doctor.hospital_id == booking.hospital_id)
            .map(Doctor::schedule)
            .ok_or(BookingError::DoctorNotFound)?;

        let snapshot = tables.snapshot(booking.doctor_id, booking.appointment_date, booking.time_slot);
        let token = plan_booking(
            &schedule,
            booking.appointment_date,
            booking.time_slot,
            today,
            policy,
            &snapshot,
        )?;

        let patient = match &booking.patient {
            BookingPatient::Existing(patient) => patient.clone(),
            BookingPatient::Inline(new) => tables.find_or_insert_patient(booking.hospital_id, new.clone()),
        };
        let appointment = Appointment::from_draft(booking.draft(&patient), &token);
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok((appointment, patient))
    }

    async fn get_appointment(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self
            .tables
            .read()
            .appointments
            .get(&id)
            .filter(|appt| appt.hospital_id == hospital_id)
            .cloned())
    }

    async fn list_appointments(
        &self,
        hospital_id: Uuid,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .tables
            .read()
            .appointments
            .values()
            .filter(|appt| appt.hospital_id == hospital_id && filter.matches(appt))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            b.appointment_date
                .cmp(&a.appointment_date)
                .then(a.doctor_id.cmp(&b.doctor_id))
                .then(a.token_serial.cmp(&b.token_serial))
        });
        Ok(page_of(appointments, page))
    }

    async fn appointments_for_day(
        &self,
        hospital_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> StoreResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .tables
            .read()
            .appointments
            .values()
            .filter(|appt| {
                appt.hospital_id == hospital_id
                    && appt.appointment_date == date
                    && doctor_id.map_or(true, |d| appt.doctor_id == d)
            })
            .cloned()
            .collect();
        appointments.sort_by_key(|appt| (appt.doctor_id, appt.token_serial));
        Ok(appointments)
    }

    async fn update_appointment_status(
        &self,
        hospital_id: Uuid,
        id: Uuid,
        next: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> StoreResult<Appointment> {
        let mut tables = self.tables.write();
        let appointment = tables
            .appointments
            .get_mut(&id)
            .filter(|appt| appt.hospital_id == hospital_id)
            .ok_or(StoreError::NotFound("Appointment"))?;

        appointment.status = appointment.status.transition(next)?;
        if next == AppointmentStatus::Cancelled {
            appointment.cancellation_reason = cancellation_reason;
        }
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn create_leave(&self, leave: NewLeave) -> StoreResult<DoctorLeave> {
        let leave = DoctorLeave::from_new(leave);
        self.tables.write().leaves.insert(leave.id, leave.clone());
        Ok(leave)
    }

    async fn get_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<DoctorLeave>> {
        Ok(self
            .tables
            .read()
            .leaves
            .get(&id)
            .filter(|leave| leave.hospital_id == hospital_id)
            .cloned())
    }

    async fn list_leaves(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<DoctorLeave>> {
        let mut leaves: Vec<DoctorLeave> = self
            .tables
            .read()
            .leaves
            .values()
            .filter(|leave| leave.hospital_id == hospital_id && leave.doctor_id == doctor_id && leave.within(from, to))
            .cloned()
            .collect();
        leaves.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(leaves)
    }

    async fn delete_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write();
        match tables.leaves.get(&id) {
            Some(leave) if leave.hospital_id == hospital_id => {
                tables.leaves.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("Leave")),
        }
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn check_in(&self, hospital_id: Uuid, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance> {
        let mut tables = self.tables.write();
        if tables
            .attendance
            .values()
            .any(|record| record.user_id == user_id && record.date == date)
        {
            return Err(StoreError::Conflict("Already checked in today".to_string()));
        }
        let record = Attendance::check_in(hospital_id, user_id, date, at);
        tables.attendance.insert(record.id, record.clone());
        Ok(record)
    }

    async fn check_out(&self, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance> {
        let mut tables = self.tables.write();
        let record = tables
            .attendance
            .values_mut()
            .find(|record| record.user_id == user_id && record.date == date)
            .ok_or(StoreError::NotFound("Check-in for today"))?;

        if record.check_out.is_some() {
            return Err(StoreError::Conflict("Already checked out today".to_string()));
        }
        record.close(at);
        Ok(record.clone())
    }

    async fn list_attendance(
        &self,
        hospital_id: Uuid,
        user_id: Option<Uuid>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<Attendance>> {
        let mut records: Vec<Attendance> = self
            .tables
            .read()
            .attendance
            .values()
            .filter(|record| {
                record.hospital_id == hospital_id
                    && user_id.map_or(true, |u| record.user_id == u)
                    && record.within(from, to)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(a.check_in.cmp(&b.check_in)));
        Ok(records)
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
