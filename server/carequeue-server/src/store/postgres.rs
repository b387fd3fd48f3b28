//! PostgreSQL store
//!
//! Bookings run in one transaction that first takes a transaction-scoped
//! advisory lock for the doctor and day. The unique index on
//! `(doctor_id, appointment_date, token_serial)` backs it up.

use async_trait::async_trait;
use booking_engine::{plan_booking, AppointmentStatus, BookingError, BookingPolicy, SlotSnapshot, TimeSlot};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

use super::{
    AppointmentRepository, AttendanceRepository, ClinicStore, DoctorRepository, HospitalRepository, LeaveRepository,
    Page, PageRequest, PatientRepository, StoreError, StoreResult, UserRepository,
};
use crate::config::DatabaseSettings;
use crate::models::hospital::{hospital_code_base, next_free_code};
use crate::models::user::normalize_email;
use crate::models::{
    Appointment, AppointmentFilter, Attendance, BookingPatient, Doctor, DoctorLeave, DoctorUpdate, Hospital,
    HospitalUpdate, NewBooking, NewDoctor, NewHospital, NewLeave, NewPatient, NewUser, Patient, PatientUpdate, Role,
    User,
};

const HOSPITAL_COLUMNS: &str = "id, name, code, address, phone, email, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, hospital_id, name, email, phone, role, designation, is_active, must_change_password, created_at, updated_at";
const DOCTOR_COLUMNS: &str = "id, hospital_id, user_id, name, specialization, qualification, initials, slot_capacity, \
     consultation_slots, consultation_fee, is_active, created_at, updated_at";
const PATIENT_COLUMNS: &str = "id, hospital_id, name, phone, email, age, gender, address, created_at, updated_at";
const APPOINTMENT_COLUMNS: &str = "id, hospital_id, doctor_id, patient_id, patient_name, appointment_date, time_slot, \
     token, token_serial, status, reason, booked_by, cancellation_reason, created_at, updated_at";
const LEAVE_COLUMNS: &str = "id, hospital_id, doctor_id, leave_date, blocked_slots, reason, created_by, created_at";
const ATTENDANCE_COLUMNS: &str =
    "id, hospital_id, user_id, work_date, check_in, check_out, status, created_at, updated_at";

// =============================================================================
// ROW MAPPING
// =============================================================================

#[derive(FromRow)]
struct HospitalRow {
    id: Uuid,
    name: String,
    code: String,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HospitalRow> for Hospital {
    fn from(row: HospitalRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
            address: row.address,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    hospital_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    designation: Option<String>,
    is_active: bool,
    must_change_password: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            hospital_id: row.hospital_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            designation: row.designation,
            is_active: row.is_active,
            must_change_password: row.must_change_password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(FromRow)]
struct DoctorRow {
    id: Uuid,
    hospital_id: Uuid,
    user_id: Uuid,
    name: String,
    specialization: Option<String>,
    qualification: Option<String>,
    initials: String,
    slot_capacity: Option<i32>,
    consultation_slots: Vec<NaiveTime>,
    consultation_fee: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Self {
            id: row.id,
            hospital_id: row.hospital_id,
            user_id: row.user_id,
            name: row.name,
            specialization: row.specialization,
            qualification: row.qualification,
            initials: row.initials,
            slot_capacity: row.slot_capacity.and_then(|c| u32::try_from(c).ok()),
            consultation_slots: row.consultation_slots.into_iter().map(TimeSlot::new).collect(),
            consultation_fee: row.consultation_fee,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PatientRow {
    id: Uuid,
    hospital_id: Uuid,
    name: String,
    phone: String,
    email: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Self {
            id: row.id,
            hospital_id: row.hospital_id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            age: row.age,
            gender: row.gender,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AppointmentRow {
    id: Uuid,
    hospital_id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
    patient_name: String,
    appointment_date: NaiveDate,
    time_slot: NaiveTime,
    token: String,
    token_serial: i32,
    status: String,
    reason: Option<String>,
    booked_by: Option<Uuid>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            hospital_id: row.hospital_id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
            appointment_date: row.appointment_date,
            time_slot: TimeSlot::new(row.time_slot),
            token: row.token,
            token_serial: u32::try_from(row.token_serial)
                .map_err(|_| StoreError::Corrupt(format!("negative token serial {}", row.token_serial)))?,
            status: row
                .status
                .parse()
                .map_err(|err: BookingError| StoreError::Corrupt(err.to_string()))?,
            reason: row.reason,
            booked_by: row.booked_by,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: Uuid,
    hospital_id: Uuid,
    doctor_id: Uuid,
    leave_date: NaiveDate,
    blocked_slots: Vec<NaiveTime>,
    reason: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<LeaveRow> for DoctorLeave {
    fn from(row: LeaveRow) -> Self {
        Self {
            id: row.id,
            hospital_id: row.hospital_id,
            doctor_id: row.doctor_id,
            date: row.leave_date,
            blocked_slots: row.blocked_slots.into_iter().map(TimeSlot::new).collect(),
            reason: row.reason,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: Uuid,
    hospital_id: Uuid,
    user_id: Uuid,
    work_date: NaiveDate,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            hospital_id: row.hospital_id,
            user_id: row.user_id,
            date: row.work_date,
            check_in: row.check_in,
            check_out: row.check_out,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn slot_times(slots: &[TimeSlot]) -> Vec<NaiveTime> {
    slots.iter().map(TimeSlot::time).collect()
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

/// Escape `LIKE` wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Map a unique violation to a conflict with `message`
fn unique_conflict(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message.to_string()),
        _ => StoreError::Database(err),
    }
}

/// Advisory lock key for one doctor's day
fn day_lock_key(doctor_id: Uuid, date: NaiveDate) -> i64 {
    let (high, low) = doctor_id.as_u64_pair();
    i64::from_ne_bytes((high ^ low).to_ne_bytes()) ^ i64::from(date.num_days_from_ce())
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and, when configured, apply the embedded migrations
    pub async fn connect(url: &str, settings: &DatabaseSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(url)
            .await?;

        if settings.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("database migrations applied");
        }

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_user(tx: &mut Transaction<'_, Postgres>, new: NewUser) -> StoreResult<User> {
        let (user, password_hash) = User::from_new(new);
        sqlx::query(
            "INSERT INTO users (id, hospital_id, name, email, phone, role, designation, password_hash, \
             is_active, must_change_password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(user.id)
        .bind(user.hospital_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.designation)
        .bind(&password_hash)
        .bind(user.is_active)
        .bind(user.must_change_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|err| unique_conflict(err, &format!("A user with email {} already exists", user.email)))?;
        Ok(user)
    }

    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO patients (id, hospital_id, name, phone, email, age, gender, address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(patient.id)
        .bind(patient.hospital_id)
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(patient.age)
        .bind(&patient.gender)
        .bind(&patient.address)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_conflict(err, "A patient with this phone number already exists"))?;
        Ok(())
    }

    /// Patient with this phone, inserted when there is none. Runs inside the
    /// booking transaction so a rejected booking leaves no patient behind.
    async fn find_or_insert_patient(
        tx: &mut Transaction<'_, Postgres>,
        hospital_id: Uuid,
        new: NewPatient,
    ) -> StoreResult<Patient> {
        let candidate = Patient::from_new(hospital_id, new);
        // A conflicting insert would abort the transaction, so skip it instead
        sqlx::query(
            "INSERT INTO patients (id, hospital_id, name, phone, email, age, gender, address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (hospital_id, phone) DO NOTHING",
        )
        .bind(candidate.id)
        .bind(candidate.hospital_id)
        .bind(&candidate.name)
        .bind(&candidate.phone)
        .bind(&candidate.email)
        .bind(candidate.age)
        .bind(&candidate.gender)
        .bind(&candidate.address)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&mut **tx)
        .await?;

        let row: PatientRow = sqlx::query_as(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE hospital_id = $1 AND phone = $2"
        ))
        .bind(hospital_id)
        .bind(&candidate.phone)
        .fetch_one(&mut **tx)
        .await?;
        Ok(Patient::from(row))
    }

    async fn save_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        sqlx::query(
            "UPDATE doctors SET name = $2, specialization = $3, qualification = $4, initials = $5, \
             slot_capacity = $6, consultation_slots = $7, consultation_fee = $8, is_active = $9, updated_at = $10 \
             WHERE id = $1",
        )
        .bind(doctor.id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.qualification)
        .bind(&doctor.initials)
        .bind(doctor.slot_capacity.map(to_i32))
        .bind(slot_times(&doctor.consultation_slots))
        .bind(doctor.consultation_fee)
        .bind(doctor.is_active)
        .bind(doctor.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn require_doctor(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Doctor> {
        self.find_doctor(hospital_id, id)
            .await?
            .ok_or(StoreError::NotFound("Doctor"))
    }
}

#[async_trait]
impl HospitalRepository for PgStore {
    async fn register_hospital(&self, hospital: NewHospital, admin: NewUser) -> StoreResult<(Hospital, User)> {
        let mut tx = self.pool.begin().await?;

        let email_taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1)")
            .bind(normalize_email(&admin.email))
            .fetch_one(&mut *tx)
            .await?;
        if email_taken {
            return Err(StoreError::Conflict(format!(
                "A user with email {} already exists",
                normalize_email(&admin.email)
            )));
        }

        let base = hospital_code_base(&hospital.name);
        let taken: Vec<String> = sqlx::query_scalar("SELECT code FROM hospitals WHERE code LIKE $1 || '%'")
            .bind(&base)
            .fetch_all(&mut *tx)
            .await?;
        let taken: HashSet<String> = taken.into_iter().collect();
        let hospital = Hospital::from_new(hospital, next_free_code(&base, &taken));

        sqlx::query(
            "INSERT INTO hospitals (id, name, code, address, phone, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(hospital.id)
        .bind(&hospital.name)
        .bind(&hospital.code)
        .bind(&hospital.address)
        .bind(&hospital.phone)
        .bind(&hospital.email)
        .bind(hospital.created_at)
        .bind(hospital.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| unique_conflict(err, "Hospital code was taken concurrently, please retry"))?;

        let admin = Self::insert_user(
            &mut tx,
            NewUser {
                hospital_id: hospital.id,
                ..admin
            },
        )
        .await?;

        tx.commit().await?;
        Ok((hospital, admin))
    }

    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>> {
        let row: Option<HospitalRow> = sqlx::query_as(&format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Hospital::from))
    }

    async fn update_hospital(&self, id: Uuid, update: HospitalUpdate) -> StoreResult<Hospital> {
        let mut hospital = self.get_hospital(id).await?.ok_or(StoreError::NotFound("Hospital"))?;
        hospital.apply(update);

        sqlx::query("UPDATE hospitals SET name = $2, address = $3, phone = $4, email = $5, updated_at = $6 WHERE id = $1")
            .bind(hospital.id)
            .bind(&hospital.name)
            .bind(&hospital.address)
            .bind(&hospital.phone)
            .bind(&hospital.email)
            .bind(hospital.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(hospital)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, user).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<(User, String)>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Ok::<_, StoreError>((User::try_from(row.user)?, row.password_hash)))
            .transpose()
    }

    async fn password_hash(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        Ok(sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_password(&self, user_id: Uuid, password_hash: String, must_change: bool) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, must_change_password = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(must_change)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn list_users(&self, hospital_id: Uuid, role: Option<Role>, page: PageRequest) -> StoreResult<Page<User>> {
        let role = role.map(|r| r.as_str());
        let (limit, offset) = limit_offset(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE hospital_id = $1 AND ($2::text IS NULL OR role = $2)",
        )
        .bind(hospital_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE hospital_id = $1 AND ($2::text IS NULL OR role = $2) \
             ORDER BY name, created_at LIMIT $3 OFFSET $4"
        ))
        .bind(hospital_id)
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: collect(rows)?,
            total,
        })
    }

    async fn set_user_active(&self, hospital_id: Uuid, user_id: Uuid, active: bool) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET is_active = $3, updated_at = NOW() WHERE id = $1 AND hospital_id = $2 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(hospital_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(StoreError::NotFound("User"))
    }
}

#[async_trait]
impl DoctorRepository for PgStore {
    async fn create_doctor(&self, user: NewUser, doctor: NewDoctor) -> StoreResult<(User, Doctor)> {
        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, user).await?;
        let doctor = Doctor::from_new(user.hospital_id, user.id, user.name.clone(), doctor);

        sqlx::query(
            "INSERT INTO doctors (id, hospital_id, user_id, name, specialization, qualification, initials, \
             slot_capacity, consultation_slots, consultation_fee, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(doctor.id)
        .bind(doctor.hospital_id)
        .bind(doctor.user_id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.qualification)
        .bind(&doctor.initials)
        .bind(doctor.slot_capacity.map(to_i32))
        .bind(slot_times(&doctor.consultation_slots))
        .bind(doctor.consultation_fee)
        .bind(doctor.is_active)
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, doctor))
    }

    async fn find_doctor(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Doctor>> {
        let row: Option<DoctorRow> = sqlx::query_as(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE hospital_id = $1 AND (id = $2 OR user_id = $2) LIMIT 1"
        ))
        .bind(hospital_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Doctor::from))
    }

    async fn list_doctors(&self, hospital_id: Uuid, active: Option<bool>, page: PageRequest) -> StoreResult<Page<Doctor>> {
        let (limit, offset) = limit_offset(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM doctors WHERE hospital_id = $1 AND ($2::boolean IS NULL OR is_active = $2)",
        )
        .bind(hospital_id)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<DoctorRow> = sqlx::query_as(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE hospital_id = $1 AND ($2::boolean IS NULL OR is_active = $2) \
             ORDER BY name, created_at LIMIT $3 OFFSET $4"
        ))
        .bind(hospital_id)
        .bind(active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Doctor::from).collect(),
            total,
        })
    }

    async fn hospital_doctors(&self, hospital_id: Uuid) -> StoreResult<Vec<Doctor>> {
        let rows: Vec<DoctorRow> = sqlx::query_as(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE hospital_id = $1 ORDER BY name"
        ))
        .bind(hospital_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    async fn update_doctor(&self, hospital_id: Uuid, doctor_id: Uuid, update: DoctorUpdate) -> StoreResult<Doctor> {
        let mut doctor = self.require_doctor(hospital_id, doctor_id).await?;
        doctor.apply(update);
        self.save_doctor(&doctor).await?;
        Ok(doctor)
    }

    async fn deactivate_doctor(&self, hospital_id: Uuid, doctor_id: Uuid) -> StoreResult<Doctor> {
        let mut doctor = self.require_doctor(hospital_id, doctor_id).await?;
        doctor.is_active = false;
        doctor.updated_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE doctors SET is_active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(doctor.id)
            .bind(doctor.updated_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(doctor.user_id)
            .bind(doctor.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(doctor)
    }
}

#[async_trait]
impl PatientRepository for PgStore {
    async fn create_patient(&self, hospital_id: Uuid, patient: NewPatient) -> StoreResult<Patient> {
        let patient = Patient::from_new(hospital_id, patient);
        self.insert_patient(&patient).await?;
        Ok(patient)
    }

    async fn get_patient(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Patient>> {
        let row: Option<PatientRow> = sqlx::query_as(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE hospital_id = $1 AND id = $2"
        ))
        .bind(hospital_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Patient::from))
    }

    async fn search_patients(&self, hospital_id: Uuid, search: Option<&str>, page: PageRequest) -> StoreResult<Page<Patient>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
        let (limit, offset) = limit_offset(page);

        let filter =
            "hospital_id = $1 AND ($2::text IS NULL OR LOWER(name) LIKE $2 ESCAPE '\\' OR phone LIKE $2 ESCAPE '\\')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM patients WHERE {filter}"))
            .bind(hospital_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<PatientRow> = sqlx::query_as(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE {filter} ORDER BY name, created_at LIMIT $3 OFFSET $4"
        ))
        .bind(hospital_id)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Patient::from).collect(),
            total,
        })
    }

    async fn update_patient(&self, hospital_id: Uuid, id: Uuid, update: PatientUpdate) -> StoreResult<Patient> {
        let mut patient = self
            .get_patient(hospital_id, id)
            .await?
            .ok_or(StoreError::NotFound("Patient"))?;
        patient.apply(update);

        sqlx::query(
            "UPDATE patients SET name = $2, phone = $3, email = $4, age = $5, gender = $6, address = $7, \
             updated_at = $8 WHERE id = $1",
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(patient.age)
        .bind(&patient.gender)
        .bind(&patient.address)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_conflict(err, "A patient with this phone number already exists"))?;
        Ok(patient)
    }
}

#[async_trait]
impl AppointmentRepository for PgStore {
    async fn book_appointment(
        &self,
        booking: NewBooking,
        policy: &BookingPolicy,
        today: NaiveDate,
    ) -> StoreResult<(Appointment, Patient)> {
        let date = booking.appointment_date;
        let slot = booking.time_slot;
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(day_lock_key(booking.doctor_id, date))
            .execute(&mut *tx)
            .await?;

        // Read under the lock; FOR SHARE holds off deactivation and schedule
        // edits until this booking commits
        let doctor: Option<DoctorRow> = sqlx::query_as(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE hospital_id = $1 AND id = $2 FOR SHARE"
        ))
        .bind(booking.hospital_id)
        .bind(booking.doctor_id)
        .fetch_optional(&mut *tx)
        .await?;
        let schedule = doctor
            .map(|row| Doctor::from(row).schedule())
            .ok_or(BookingError::DoctorNotFound)?;

        let leaves: Vec<LeaveRow> = sqlx::query_as(&format!(
            "SELECT {LEAVE_COLUMNS} FROM doctor_leaves WHERE doctor_id = $1 AND leave_date = $2"
        ))
        .bind(booking.doctor_id)
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;

        let (active_in_slot, max_serial): (i64, Option<i32>) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE time_slot = $3 AND status <> 'cancelled'), MAX(token_serial) \
             FROM appointments WHERE doctor_id = $1 AND appointment_date = $2",
        )
        .bind(booking.doctor_id)
        .bind(date)
        .bind(slot.time())
        .fetch_one(&mut *tx)
        .await?;

        let snapshot = SlotSnapshot {
            leaves: leaves.into_iter().map(|row| DoctorLeave::from(row).block()).collect(),
            active_in_slot: u32::try_from(active_in_slot).unwrap_or(u32::MAX),
            max_serial: max_serial.and_then(|s| u32::try_from(s).ok()),
        };
        let token = plan_booking(&schedule, date, slot, today, policy, &snapshot)?;

        let patient = match &booking.patient {
            BookingPatient::Existing(patient) => patient.clone(),
            BookingPatient::Inline(new) => {
                Self::find_or_insert_patient(&mut tx, booking.hospital_id, new.clone()).await?
            }
        };
        let appointment = Appointment::from_draft(booking.draft(&patient), &token);

        sqlx::query(
            "INSERT INTO appointments (id, hospital_id, doctor_id, patient_id, patient_name, appointment_date, \
             time_slot, token, token_serial, status, reason, booked_by, cancellation_reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(appointment.id)
        .bind(appointment.hospital_id)
        .bind(appointment.doctor_id)
        .bind(appointment.patient_id)
        .bind(&appointment.patient_name)
        .bind(appointment.appointment_date)
        .bind(appointment.time_slot.time())
        .bind(&appointment.token)
        .bind(to_i32(appointment.token_serial))
        .bind(appointment.status.as_str())
        .bind(&appointment.reason)
        .bind(appointment.booked_by)
        .bind(&appointment.cancellation_reason)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| unique_conflict(err, "Token serial already issued, please retry"))?;

        tx.commit().await?;
        Ok((appointment, patient))
    }

    async fn get_appointment(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<Appointment>> {
        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE hospital_id = $1 AND id = $2"
        ))
        .bind(hospital_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Appointment::try_from).transpose()
    }

    async fn list_appointments(
        &self,
        hospital_id: Uuid,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Appointment>> {
        let where_clause = "hospital_id = $1 \
             AND ($2::date IS NULL OR appointment_date = $2) \
             AND ($3::uuid IS NULL OR doctor_id = $3) \
             AND ($4::uuid IS NULL OR patient_id = $4) \
             AND ($5::text IS NULL OR status = $5)";
        let status = filter.status.map(|s| s.as_str());
        let (limit, offset) = limit_offset(page);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM appointments WHERE {where_clause}"))
            .bind(hospital_id)
            .bind(filter.date)
            .bind(filter.doctor_id)
            .bind(filter.patient_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE {where_clause} \
             ORDER BY appointment_date DESC, doctor_id, token_serial LIMIT $6 OFFSET $7"
        ))
        .bind(hospital_id)
        .bind(filter.date)
        .bind(filter.doctor_id)
        .bind(filter.patient_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: collect(rows)?,
            total,
        })
    }

    async fn appointments_for_day(
        &self,
        hospital_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> StoreResult<Vec<Appointment>> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE hospital_id = $1 AND appointment_date = $2 AND ($3::uuid IS NULL OR doctor_id = $3) \
             ORDER BY doctor_id, token_serial"
        ))
        .bind(hospital_id)
        .bind(date)
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn update_appointment_status(
        &self,
        hospital_id: Uuid,
        id: Uuid,
        next: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> StoreResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE hospital_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(hospital_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut appointment = row
            .map(Appointment::try_from)
            .transpose()?
            .ok_or(StoreError::NotFound("Appointment"))?;

        appointment.status = appointment.status.transition(next)?;
        if next == AppointmentStatus::Cancelled {
            appointment.cancellation_reason = cancellation_reason;
        }
        appointment.updated_at = Utc::now();

        sqlx::query("UPDATE appointments SET status = $2, cancellation_reason = $3, updated_at = $4 WHERE id = $1")
            .bind(appointment.id)
            .bind(appointment.status.as_str())
            .bind(&appointment.cancellation_reason)
            .bind(appointment.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(appointment)
    }
}

#[async_trait]
impl LeaveRepository for PgStore {
    async fn create_leave(&self, leave: NewLeave) -> StoreResult<DoctorLeave> {
        let leave = DoctorLeave::from_new(leave);

        // Same lock as booking, so a leave and a booking for the day serialize
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(day_lock_key(leave.doctor_id, leave.date))
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO doctor_leaves (id, hospital_id, doctor_id, leave_date, blocked_slots, reason, created_by, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(leave.id)
        .bind(leave.hospital_id)
        .bind(leave.doctor_id)
        .bind(leave.date)
        .bind(slot_times(&leave.blocked_slots))
        .bind(&leave.reason)
        .bind(leave.created_by)
        .bind(leave.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(leave)
    }

    async fn get_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<Option<DoctorLeave>> {
        let row: Option<LeaveRow> = sqlx::query_as(&format!(
            "SELECT {LEAVE_COLUMNS} FROM doctor_leaves WHERE hospital_id = $1 AND id = $2"
        ))
        .bind(hospital_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DoctorLeave::from))
    }

    async fn list_leaves(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<DoctorLeave>> {
        let rows: Vec<LeaveRow> = sqlx::query_as(&format!(
            "SELECT {LEAVE_COLUMNS} FROM doctor_leaves \
             WHERE hospital_id = $1 AND doctor_id = $2 \
             AND ($3::date IS NULL OR leave_date >= $3) AND ($4::date IS NULL OR leave_date <= $4) \
             ORDER BY leave_date, created_at"
        ))
        .bind(hospital_id)
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DoctorLeave::from).collect())
    }

    async fn delete_leave(&self, hospital_id: Uuid, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM doctor_leaves WHERE hospital_id = $1 AND id = $2")
            .bind(hospital_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Leave"));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for PgStore {
    async fn check_in(&self, hospital_id: Uuid, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance> {
        let record = Attendance::check_in(hospital_id, user_id, date, at);

        sqlx::query(
            "INSERT INTO attendance (id, hospital_id, user_id, work_date, check_in, check_out, status, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.hospital_id)
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_conflict(err, "Already checked in today"))?;

        Ok(record)
    }

    async fn check_out(&self, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> StoreResult<Attendance> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AttendanceRow> = sqlx::query_as(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = $1 AND work_date = $2 FOR UPDATE"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;
        let mut record = row
            .map(Attendance::try_from)
            .transpose()?
            .ok_or(StoreError::NotFound("Check-in for today"))?;

        if record.check_out.is_some() {
            return Err(StoreError::Conflict("Already checked out today".to_string()));
        }
        record.close(at);

        sqlx::query("UPDATE attendance SET check_out = $2, status = $3, updated_at = $4 WHERE id = $1")
            .bind(record.id)
            .bind(record.check_out)
            .bind(record.status.as_str())
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn list_attendance(
        &self,
        hospital_id: Uuid,
        user_id: Option<Uuid>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> StoreResult<Vec<Attendance>> {
        let rows: Vec<AttendanceRow> = sqlx::query_as(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE hospital_id = $1 AND ($2::uuid IS NULL OR user_id = $2) \
             AND ($3::date IS NULL OR work_date >= $3) AND ($4::date IS NULL OR work_date <= $4) \
             ORDER BY work_date DESC, check_in"
        ))
        .bind(hospital_id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}

#[async_trait]
impl ClinicStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_lock_key_differs_by_day_and_doctor() {
        let doctor = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        assert_eq!(day_lock_key(doctor, monday), day_lock_key(doctor, monday));
        assert_ne!(day_lock_key(doctor, monday), day_lock_key(doctor, tuesday));
        assert_ne!(day_lock_key(doctor, monday), day_lock_key(Uuid::new_v4(), monday));
    }

    #[test]
    fn test_escape_like_matches_wildcards_literally() {
        assert_eq!(escape_like("kiran"), "kiran");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
    }

    #[test]
    fn test_rows_map_to_models() {
        let now = Utc::now();
        let row = AppointmentRow {
            id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            patient_name: "Kiran Shah".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            time_slot: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            token: "20260309-AR-003".to_string(),
            token_serial: 3,
            status: "checked_in".to_string(),
            reason: None,
            booked_by: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        let appt = Appointment::try_from(row).unwrap();
        assert_eq!(appt.status, AppointmentStatus::CheckedIn);
        assert_eq!(appt.time_slot.to_string(), "10:30");
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let now = Utc::now();
        let row = AttendanceRow {
            id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            work_date: now.date_naive(),
            check_in: now,
            check_out: None,
            status: "absent".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(Attendance::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
