//! Booking decision
//!
//! [`plan_booking`] applies, in order: doctor active, date not in the past,
//! slot offered by the doctor, leave blocking, slot capacity. If all pass
//! it returns the next token for the doctor's day.
//!
//! The caller must hold the doctor+day lock from the moment the
//! [`SlotSnapshot`] is read until the appointment is written, otherwise two
//! bookings can receive the same serial.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{doctor_initials, find_blocking, BookingError, LeaveBlock, TimeSlot, Token, DEFAULT_SLOT_CAPACITY};

/// Booking settings shared by every doctor of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPolicy {
    pub default_slot_capacity: u32,
    pub allow_past_dates: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            default_slot_capacity: DEFAULT_SLOT_CAPACITY,
            allow_past_dates: false,
        }
    }
}

/// The parts of a doctor profile that matter for booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorSchedule {
    pub initials: String,
    pub active: bool,
    pub slot_capacity: Option<u32>,
    /// Empty means every slot may be booked
    pub consultation_slots: Vec<TimeSlot>,
}

impl DoctorSchedule {
    pub fn new(name: &str) -> Self {
        Self {
            initials: doctor_initials(name),
            active: true,
            slot_capacity: None,
            consultation_slots: Vec::new(),
        }
    }

    pub fn capacity(&self, policy: &BookingPolicy) -> u32 {
        self.slot_capacity
            .unwrap_or(policy.default_slot_capacity)
            .max(1)
    }

    pub fn offers(&self, slot: TimeSlot) -> bool {
        self.consultation_slots.is_empty() || self.consultation_slots.contains(&slot)
    }
}

/// State of a doctor's day read inside the booking critical section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSnapshot {
    /// Leaves for the requested date
    pub leaves: Vec<LeaveBlock>,
    /// Non-cancelled appointments already in the requested slot
    pub active_in_slot: u32,
    /// Highest serial issued for the doctor's day, cancelled ones included
    pub max_serial: Option<u32>,
}

pub fn plan_booking(
    doctor: &DoctorSchedule,
    date: NaiveDate,
    slot: TimeSlot,
    today: NaiveDate,
    policy: &BookingPolicy,
    snapshot: &SlotSnapshot,
) -> Result<Token, BookingError> {
    if !doctor.active {
        return Err(BookingError::DoctorInactive);
    }

    if date < today && !policy.allow_past_dates {
        return Err(BookingError::PastDate(date));
    }

    if !doctor.offers(slot) {
        return Err(BookingError::SlotNotOffered { slot });
    }

    if let Some(leave) = find_blocking(&snapshot.leaves, date, slot) {
        return Err(leave.rejection(slot));
    }

    let capacity = doctor.capacity(policy);
    if snapshot.active_in_slot >= capacity {
        tracing::debug!(%date, %slot, capacity, "slot at capacity");
        return Err(BookingError::SlotFull { date, slot, capacity });
    }

    Ok(Token::next_after(date, doctor.initials.clone(), snapshot.max_serial))
}
