use chrono::NaiveDate;
use thiserror::Error;

use crate::{AppointmentStatus, TimeSlot};

/// Reasons a booking or status change is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not accepting appointments")]
    DoctorInactive,

    #[error("Cannot book an appointment on a past date ({0})")]
    PastDate(NaiveDate),

    #[error("Slot {slot} is not one of the doctor's consultation slots")]
    SlotNotOffered { slot: TimeSlot },

    #[error("Doctor is on leave on {date}")]
    FullDayLeave { date: NaiveDate },

    #[error("Doctor is unavailable at {slot} on {date}")]
    SlotBlocked { date: NaiveDate, slot: TimeSlot },

    #[error("Slot {slot} on {date} is full ({capacity} bookings)")]
    SlotFull {
        date: NaiveDate,
        slot: TimeSlot,
        capacity: u32,
    },

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Invalid time slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid appointment status: {0}")]
    InvalidStatus(String),
}

impl BookingError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::DoctorNotFound => "doctor_not_found",
            BookingError::DoctorInactive => "doctor_inactive",
            BookingError::PastDate(_) => "past_date",
            BookingError::SlotNotOffered { .. } => "slot_not_offered",
            BookingError::FullDayLeave { .. } => "doctor_on_leave",
            BookingError::SlotBlocked { .. } => "slot_blocked",
            BookingError::SlotFull { .. } => "slot_full",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::InvalidSlot(_) => "invalid_slot",
            BookingError::InvalidStatus(_) => "invalid_status",
        }
    }

    /// Whether the error comes from malformed input rather than a schedule conflict
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BookingError::PastDate(_)
                | BookingError::InvalidSlot(_)
                | BookingError::InvalidStatus(_)
        )
    }
}
