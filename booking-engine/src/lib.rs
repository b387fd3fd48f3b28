//! Booking rules for CareQueue
//!
//! This crate holds the parts of appointment booking that do not touch
//! storage: consultation time slots, the appointment status lifecycle, the
//! daily token format, leave blocking, slot capacity and the queue view.
//!
//! Storage backends gather a [`SlotSnapshot`] for a doctor and day while
//! holding whatever lock makes the booking atomic, then call
//! [`plan_booking`] to decide whether the booking is accepted and which
//! token it receives.
//!
//! # Example
//!
//! ```rust
//! use booking_engine::{plan_booking, BookingPolicy, DoctorSchedule, SlotSnapshot, TimeSlot};
//! use chrono::NaiveDate;
//!
//! let doctor = DoctorSchedule::new("Dr. Asha Rao");
//! let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
//! let slot: TimeSlot = "10:30".parse().unwrap();
//!
//! let snapshot = SlotSnapshot { leaves: vec![], active_in_slot: 0, max_serial: Some(4) };
//! let token = plan_booking(&doctor, date, slot, date, &BookingPolicy::default(), &snapshot).unwrap();
//! assert_eq!(token.to_string(), "20260309-AR-005");
//! ```

pub mod availability;
pub mod error;
pub mod leave;
pub mod planner;
pub mod queue;
pub mod slot;
pub mod status;
pub mod token;

pub use availability::{day_availability, DayAvailability, SlotAvailability};
pub use error::BookingError;
pub use leave::{find_blocking, LeaveBlock};
pub use planner::{plan_booking, BookingPolicy, DoctorSchedule, SlotSnapshot};
pub use queue::{mask_name, DoctorQueue, QueueTicket};
pub use slot::TimeSlot;
pub use status::AppointmentStatus;
pub use token::{doctor_initials, Token};

/// Slot capacity used when neither the doctor nor the configuration sets one
pub const DEFAULT_SLOT_CAPACITY: u32 = 5;
