use booking_engine::{AppointmentStatus, QueueTicket, TimeSlot, Token};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{NewPatient, Patient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "10:30")]
    pub time_slot: TimeSlot,
    #[schema(example = "20260309-AR-005")]
    pub token: String,
    pub token_serial: u32,
    #[schema(value_type = String, example = "booked")]
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub booked_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything about a booking except its token
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    pub booked_by: Option<Uuid>,
}

/// Who a booking is for
#[derive(Debug, Clone)]
pub enum BookingPatient {
    Existing(Patient),
    /// Matched by phone, or created once the booking is accepted
    Inline(NewPatient),
}

/// A booking as handed to the store, before the slot is checked
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient: BookingPatient,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    pub booked_by: Option<Uuid>,
}

impl NewBooking {
    pub fn draft(&self, patient: &Patient) -> BookingDraft {
        BookingDraft {
            hospital_id: self.hospital_id,
            doctor_id: self.doctor_id,
            patient_id: patient.id,
            patient_name: patient.name.clone(),
            appointment_date: self.appointment_date,
            time_slot: self.time_slot,
            reason: self.reason.clone(),
            booked_by: self.booked_by,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl Appointment {
    pub fn from_draft(draft: BookingDraft, token: &Token) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hospital_id: draft.hospital_id,
            doctor_id: draft.doctor_id,
            patient_id: draft.patient_id,
            patient_name: draft.patient_name,
            appointment_date: draft.appointment_date,
            time_slot: draft.time_slot,
            token: token.to_string(),
            token_serial: token.serial(),
            status: AppointmentStatus::Booked,
            reason: draft.reason,
            booked_by: draft.booked_by,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ticket(&self) -> QueueTicket {
        QueueTicket {
            appointment_id: self.id,
            token: self.token.clone(),
            serial: self.token_serial,
            patient_name: self.patient_name.clone(),
            time_slot: self.time_slot,
            status: self.status,
            position: 0,
        }
    }
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.date.map_or(true, |d| appointment.appointment_date == d)
            && self.doctor_id.map_or(true, |d| appointment.doctor_id == d)
            && self.patient_id.map_or(true, |p| appointment.patient_id == p)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment() -> Appointment {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let draft = BookingDraft {
            hospital_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            patient_name: "Kiran Shah".to_string(),
            appointment_date: date,
            time_slot: "10:30".parse().unwrap(),
            reason: None,
            booked_by: None,
        };
        Appointment::from_draft(draft, &Token::new(date, "AR", 7))
    }

    #[test]
    fn test_from_draft_uses_token() {
        let appt = appointment();
        assert_eq!(appt.token, "20260309-AR-007");
        assert_eq!(appt.token_serial, 7);
        assert_eq!(appt.status, AppointmentStatus::Booked);
    }

    #[test]
    fn test_filter_matches_every_set_field() {
        let appt = appointment();
        assert!(AppointmentFilter::default().matches(&appt));

        let filter = AppointmentFilter {
            doctor_id: Some(appt.doctor_id),
            status: Some(AppointmentStatus::Booked),
            ..AppointmentFilter::default()
        };
        assert!(filter.matches(&appt));

        let filter = AppointmentFilter {
            status: Some(AppointmentStatus::Cancelled),
            ..AppointmentFilter::default()
        };
        assert!(!filter.matches(&appt));
    }
}
