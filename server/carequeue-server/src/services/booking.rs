//! Booking, queue and availability
//!
//! The store makes each booking atomic; this service resolves the doctor
//! and patient around it and sends the confirmation email afterwards.

use booking_engine::{
    day_availability, AppointmentStatus, BookingError, BookingPolicy, DayAvailability, DoctorQueue, LeaveBlock,
    TimeSlot,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::logging::mask_phone;
use crate::models::{Appointment, BookingPatient, Doctor, DoctorLeave, NewBooking, NewLeave, NewPatient, Patient};
use crate::notifications::{booking_confirmation, deliver, Mailer};
use crate::server::CareQueueServer;
use crate::store::{
    AppointmentRepository, ClinicStore, DoctorRepository, HospitalRepository, LeaveRepository, PatientRepository,
};
use crate::validation::{looks_like_phone, RequestValidation};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    /// Doctor id or the doctor's user id
    pub doctor_id: Uuid,
    /// Existing patient; leave empty to pass `patient` instead
    pub patient_id: Option<Uuid>,
    /// Inline patient, matched to an existing record by phone
    pub patient: Option<NewPatient>,
    pub appointment_date: NaiveDate,
    #[schema(example = "10:30")]
    pub time_slot: String,
    pub reason: Option<String>,
}

impl RequestValidation for CreateAppointmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        match (&self.patient_id, &self.patient) {
            (Some(_), Some(_)) => Err(ApiError::validation("Provide either patient_id or patient, not both")),
            (None, None) => Err(ApiError::validation("Either patient_id or patient is required")),
            (None, Some(patient)) => patient.validate(),
            (Some(_), None) => Ok(()),
        }
    }
}

impl RequestValidation for NewPatient {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.name, "Patient name is required");
        crate::validate_length!(self.name, 1, 200, "Patient name must be at most 200 characters");
        crate::validate_field!(self.phone, looks_like_phone(&self.phone), "Invalid phone number");
        crate::validate_optional_email!(self.email, "Invalid email format");
        if let Some(age) = self.age {
            crate::validate_range!(age, 0, 150, "Age must be between 0 and 150");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLeaveRequest {
    pub date: NaiveDate,
    /// Slots to block; empty or missing blocks the whole day
    #[serde(default)]
    #[schema(example = json!(["09:00", "09:30"]))]
    pub blocked_slots: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveCreated {
    pub leave: DoctorLeave,
    /// Active appointments that fall inside the new block; they are not cancelled
    pub overlapping_appointments: usize,
}

pub struct BookingService {
    store: Arc<dyn ClinicStore>,
    mailer: Arc<dyn Mailer>,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(store: Arc<dyn ClinicStore>, mailer: Arc<dyn Mailer>, policy: BookingPolicy) -> Self {
        Self { store, mailer, policy }
    }

    pub fn from_state(state: &CareQueueServer) -> Self {
        Self::new(state.store.clone(), state.mailer.clone(), state.policy().clone())
    }

    async fn require_doctor(&self, hospital_id: Uuid, id: Uuid) -> ApiResult<Doctor> {
        self.store
            .find_doctor(hospital_id, id)
            .await?
            .ok_or(ApiError::Booking(BookingError::DoctorNotFound))
    }

    /// Existing patients are loaded here; inline ones are matched or created
    /// by the store only once the booking is accepted
    async fn booking_patient(&self, hospital_id: Uuid, request: &CreateAppointmentRequest) -> ApiResult<BookingPatient> {
        if let Some(patient_id) = request.patient_id {
            return self
                .store
                .get_patient(hospital_id, patient_id)
                .await?
                .map(BookingPatient::Existing)
                .ok_or_else(|| ApiError::not_found("Patient"));
        }
        request
            .patient
            .clone()
            .map(BookingPatient::Inline)
            .ok_or_else(|| ApiError::validation("Either patient_id or patient is required"))
    }

    /// Book a slot and email the patient if possible
    pub async fn book(
        &self,
        hospital_id: Uuid,
        booked_by: Option<Uuid>,
        request: CreateAppointmentRequest,
        today: NaiveDate,
    ) -> ApiResult<Appointment> {
        request.validate()?;
        let time_slot: TimeSlot = request.time_slot.parse()?;
        let doctor = self.require_doctor(hospital_id, request.doctor_id).await?;
        let patient = self.booking_patient(hospital_id, &request).await?;

        let booking = NewBooking {
            hospital_id,
            doctor_id: doctor.id,
            patient,
            appointment_date: request.appointment_date,
            time_slot,
            reason: request.reason,
            booked_by,
        };

        let (appointment, patient) = self.store.book_appointment(booking, &self.policy, today).await?;
        tracing::debug!(patient_id = %patient.id, phone = %mask_phone(&patient.phone), "booking patient resolved");

        tracing::info!(
            appointment_id = %appointment.id,
            doctor_id = %doctor.id,
            token = %appointment.token,
            slot = %appointment.time_slot,
            "appointment booked"
        );

        self.send_confirmation(&appointment, &patient, &doctor).await;
        Ok(appointment)
    }

    async fn send_confirmation(&self, appointment: &Appointment, patient: &Patient, doctor: &Doctor) {
        if !self.mailer.delivers() {
            return;
        }
        let hospital = match self.store.get_hospital(appointment.hospital_id).await {
            Ok(Some(hospital)) => hospital,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "could not load hospital for booking confirmation");
                return;
            }
        };
        if let Some(message) = booking_confirmation(appointment, patient, doctor, &hospital) {
            deliver(self.mailer.as_ref(), message).await;
        }
    }

    pub async fn set_status(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        next: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> ApiResult<Appointment> {
        let appointment = self
            .store
            .update_appointment_status(hospital_id, appointment_id, next, cancellation_reason)
            .await?;
        tracing::info!(appointment_id = %appointment.id, status = %appointment.status, "appointment status changed");
        Ok(appointment)
    }

    /// Queues for every doctor with appointments that day, or for one doctor
    pub async fn day_queues(
        &self,
        hospital_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> ApiResult<Vec<DoctorQueue>> {
        let doctors: Vec<Doctor> = match doctor_id {
            Some(id) => vec![self.require_doctor(hospital_id, id).await?],
            None => self.store.hospital_doctors(hospital_id).await?,
        };

        let scoped_doctor = doctor_id.and_then(|_| doctors.first().map(|doctor| doctor.id));
        let appointments = self
            .store
            .appointments_for_day(hospital_id, date, scoped_doctor)
            .await?;

        let mut by_doctor: HashMap<Uuid, Vec<Appointment>> = HashMap::new();
        for appointment in appointments {
            by_doctor.entry(appointment.doctor_id).or_default().push(appointment);
        }

        let mut queues: Vec<DoctorQueue> = doctors
            .into_iter()
            .filter_map(|doctor| {
                let appointments = by_doctor.remove(&doctor.id).unwrap_or_default();
                if doctor_id.is_none() && appointments.is_empty() {
                    return None;
                }
                Some(DoctorQueue::build(
                    doctor.id,
                    doctor.name,
                    appointments.iter().map(Appointment::ticket),
                ))
            })
            .collect();
        queues.sort_by(|a, b| a.doctor_name.cmp(&b.doctor_name));
        Ok(queues)
    }

    pub async fn availability(&self, hospital_id: Uuid, doctor_id: Uuid, date: NaiveDate) -> ApiResult<DayAvailability> {
        let doctor = self.require_doctor(hospital_id, doctor_id).await?;
        let leaves: Vec<LeaveBlock> = self
            .store
            .list_leaves(hospital_id, doctor.id, Some(date), Some(date))
            .await?
            .iter()
            .map(DoctorLeave::block)
            .collect();

        let mut booked: BTreeMap<TimeSlot, u32> = BTreeMap::new();
        for appointment in self
            .store
            .appointments_for_day(hospital_id, date, Some(doctor.id))
            .await?
            .iter()
            .filter(|appointment| appointment.status.is_active())
        {
            *booked.entry(appointment.time_slot).or_default() += 1;
        }

        Ok(day_availability(&doctor.schedule(), date, &self.policy, &leaves, &booked))
    }

    /// Block a day or some slots for a doctor
    pub async fn add_leave(
        &self,
        doctor: &Doctor,
        request: CreateLeaveRequest,
        created_by: Uuid,
        today: NaiveDate,
    ) -> ApiResult<LeaveCreated> {
        if request.date < today {
            return Err(ApiError::validation("Leave date cannot be in the past"));
        }
        let blocked_slots = request
            .blocked_slots
            .iter()
            .map(|slot| slot.parse::<TimeSlot>())
            .collect::<Result<Vec<_>, _>>()?;

        let leave = self
            .store
            .create_leave(NewLeave {
                hospital_id: doctor.hospital_id,
                doctor_id: doctor.id,
                date: request.date,
                blocked_slots,
                reason: request.reason,
                created_by: Some(created_by),
            })
            .await?;

        let block = leave.block();
        let overlapping_appointments = self
            .store
            .appointments_for_day(doctor.hospital_id, leave.date, Some(doctor.id))
            .await?
            .iter()
            .filter(|appointment| appointment.status.is_active() && block.blocks(leave.date, appointment.time_slot))
            .count();

        if overlapping_appointments > 0 {
            tracing::warn!(
                doctor_id = %doctor.id,
                date = %leave.date,
                overlapping_appointments,
                "leave overlaps existing appointments"
            );
        }

        Ok(LeaveCreated {
            leave,
            overlapping_appointments,
        })
    }
}
