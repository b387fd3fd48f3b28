use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{BookingPolicy, DoctorSchedule, LeaveBlock, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub full_day_blocked: bool,
    pub slots: Vec<SlotAvailability>,
}

/// Per-slot view of a doctor's day
///
/// `booked` holds the non-cancelled appointment count per slot. Doctors
/// without configured consultation slots report the slots that have
/// bookings or blocks.
pub fn day_availability(
    doctor: &DoctorSchedule,
    date: NaiveDate,
    policy: &BookingPolicy,
    leaves: &[LeaveBlock],
    booked: &BTreeMap<TimeSlot, u32>,
) -> DayAvailability {
    let day_leaves: Vec<&LeaveBlock> = leaves.iter().filter(|leave| leave.date == date).collect();
    let full_day_blocked = day_leaves.iter().any(|leave| leave.is_full_day());

    let slots: BTreeSet<TimeSlot> = if doctor.consultation_slots.is_empty() {
        booked
            .keys()
            .copied()
            .chain(day_leaves.iter().flat_map(|leave| leave.blocked_slots.iter().copied()))
            .collect()
    } else {
        doctor.consultation_slots.iter().copied().collect()
    };

    let capacity = doctor.capacity(policy);
    let slots = slots
        .into_iter()
        .map(|slot| {
            let booked = booked.get(&slot).copied().unwrap_or(0);
            let blocked = day_leaves.iter().any(|leave| leave.blocks(date, slot));
            let remaining = if blocked || !doctor.active {
                0
            } else {
                capacity.saturating_sub(booked)
            };
            SlotAvailability {
                slot,
                capacity,
                booked,
                remaining,
                blocked,
            }
        })
        .collect();

    DayAvailability {
        date,
        full_day_blocked,
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    #[test]
    fn test_configured_slots_with_bookings_and_block() {
        let mut doctor = DoctorSchedule::new("Dr. Asha Rao");
        doctor.consultation_slots = vec![slot("09:00"), slot("09:30"), slot("10:00")];
        let leaves = vec![LeaveBlock::slots(day(9), [slot("10:00")])];
        let booked = BTreeMap::from([(slot("09:00"), 5), (slot("09:30"), 2)]);

        let view = day_availability(&doctor, day(9), &BookingPolicy::default(), &leaves, &booked);

        assert!(!view.full_day_blocked);
        let remaining: Vec<u32> = view.slots.iter().map(|s| s.remaining).collect();
        assert_eq!(remaining, vec![0, 3, 0]);
        assert!(view.slots.iter().any(|s| s.slot == slot("10:00") && s.blocked));
    }

    #[test]
    fn test_full_day_leave_zeroes_everything() {
        let mut doctor = DoctorSchedule::new("Rahul Verma");
        doctor.consultation_slots = vec![slot("09:00"), slot("17:00")];
        let leaves = vec![LeaveBlock::full_day(day(9)), LeaveBlock::full_day(day(10))];

        let view = day_availability(&doctor, day(9), &BookingPolicy::default(), &leaves, &BTreeMap::new());

        assert!(view.full_day_blocked);
        assert!(view.slots.iter().all(|s| s.blocked && s.remaining == 0));
    }

    #[test]
    fn test_unconfigured_doctor_lists_seen_slots() {
        let doctor = DoctorSchedule::new("Rahul Verma");
        let leaves = vec![LeaveBlock::slots(day(9), [slot("12:00")])];
        let booked = BTreeMap::from([(slot("11:00"), 1)]);

        let view = day_availability(&doctor, day(9), &BookingPolicy::default(), &leaves, &booked);

        let listed: Vec<TimeSlot> = view.slots.iter().map(|s| s.slot).collect();
        assert_eq!(listed, vec![slot("11:00"), slot("12:00")]);
    }
}
