use booking_engine::{LeaveBlock, TimeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DoctorLeave {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Empty means the whole day is blocked
    #[schema(value_type = Vec<String>)]
    pub blocked_slots: Vec<TimeSlot>,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLeave {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub blocked_slots: Vec<TimeSlot>,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
}

impl DoctorLeave {
    pub fn from_new(new: NewLeave) -> Self {
        let mut blocked_slots = new.blocked_slots;
        blocked_slots.sort();
        blocked_slots.dedup();

        Self {
            id: Uuid::new_v4(),
            hospital_id: new.hospital_id,
            doctor_id: new.doctor_id,
            date: new.date,
            blocked_slots,
            reason: new.reason,
            created_by: new.created_by,
            created_at: Utc::now(),
        }
    }

    pub fn is_full_day(&self) -> bool {
        self.blocked_slots.is_empty()
    }

    pub fn block(&self) -> LeaveBlock {
        LeaveBlock {
            date: self.date,
            blocked_slots: self.blocked_slots.clone(),
        }
    }

    /// Whether the leave falls within an optional inclusive date range
    pub fn within(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |from| self.date >= from) && to.map_or(true, |to| self.date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn leave(slots: &[&str]) -> DoctorLeave {
        DoctorLeave::from_new(NewLeave {
            hospital_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: day(9),
            blocked_slots: slots.iter().map(|s| s.parse().unwrap()).collect(),
            reason: None,
            created_by: None,
        })
    }

    #[test]
    fn test_slots_are_deduplicated() {
        let leave = leave(&["11:00", "10:00", "11:00"]);
        assert_eq!(leave.blocked_slots.len(), 2);
        assert!(!leave.is_full_day());
        assert_eq!(leave.block().blocked_slots, leave.blocked_slots);
    }

    #[test]
    fn test_within_range() {
        let leave = leave(&[]);
        assert!(leave.is_full_day());
        assert!(leave.within(None, None));
        assert!(leave.within(Some(day(9)), Some(day(9))));
        assert!(!leave.within(Some(day(10)), None));
        assert!(!leave.within(None, Some(day(8))));
    }
}
