use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{BookingError, TimeSlot};

/// A doctor's unavailability on one date
///
/// An empty `blocked_slots` list blocks the whole day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBlock {
    pub date: NaiveDate,
    #[serde(default)]
    pub blocked_slots: Vec<TimeSlot>,
}

impl LeaveBlock {
    pub fn full_day(date: NaiveDate) -> Self {
        Self {
            date,
            blocked_slots: Vec::new(),
        }
    }

    pub fn slots(date: NaiveDate, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        let mut blocked_slots: Vec<TimeSlot> = slots.into_iter().collect();
        blocked_slots.sort();
        blocked_slots.dedup();
        Self { date, blocked_slots }
    }

    pub fn is_full_day(&self) -> bool {
        self.blocked_slots.is_empty()
    }

    pub fn blocks(&self, date: NaiveDate, slot: TimeSlot) -> bool {
        self.date == date && (self.is_full_day() || self.blocked_slots.contains(&slot))
    }

    /// The rejection a booking at `slot` would get from this leave
    pub fn rejection(&self, slot: TimeSlot) -> BookingError {
        if self.is_full_day() {
            BookingError::FullDayLeave { date: self.date }
        } else {
            BookingError::SlotBlocked {
                date: self.date,
                slot,
            }
        }
    }
}

/// First leave that blocks `slot` on `date`, full-day leaves first
pub fn find_blocking(leaves: &[LeaveBlock], date: NaiveDate, slot: TimeSlot) -> Option<&LeaveBlock> {
    leaves
        .iter()
        .filter(|leave| leave.blocks(date, slot))
        .min_by_key(|leave| !leave.is_full_day())
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
    fn test_full_day_blocks_every_slot() {
        let leave = LeaveBlock::full_day(day(9));
        assert!(leave.blocks(day(9), slot("08:00")));
        assert!(leave.blocks(day(9), slot("19:30")));
        assert!(!leave.blocks(day(10), slot("08:00")));
    }

    #[test]
    fn test_slot_leave_blocks_listed_slots_only() {
        let leave = LeaveBlock::slots(day(9), [slot("10:00"), slot("10:30")]);
        assert!(leave.blocks(day(9), slot("10:30")));
        assert!(!leave.blocks(day(9), slot("11:00")));
        assert!(!leave.is_full_day());
    }

    #[test]
    fn test_slots_are_sorted_and_deduplicated() {
        let leave = LeaveBlock::slots(day(9), [slot("11:00"), slot("09:00"), slot("11:00")]);
        assert_eq!(leave.blocked_slots, vec![slot("09:00"), slot("11:00")]);
    }

    #[test]
    fn test_find_blocking_prefers_full_day() {
        let leaves = vec![
            LeaveBlock::slots(day(9), [slot("10:00")]),
            LeaveBlock::full_day(day(9)),
        ];
        let found = find_blocking(&leaves, day(9), slot("10:00")).unwrap();
        assert!(found.is_full_day());
        assert_eq!(
            found.rejection(slot("10:00")),
            BookingError::FullDayLeave { date: day(9) }
        );
    }

    #[test]
    fn test_find_blocking_none() {
        let leaves = vec![LeaveBlock::slots(day(9), [slot("10:00")])];
        assert!(find_blocking(&leaves, day(9), slot("10:15")).is_none());
        assert!(find_blocking(&[], day(9), slot("10:00")).is_none());
    }
}
