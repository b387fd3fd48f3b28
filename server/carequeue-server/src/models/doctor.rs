use booking_engine::{doctor_initials, DoctorSchedule, TimeSlot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Doctor {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    /// Used in tokens, derived from the name
    pub initials: String,
    /// Overrides the configured default when set
    pub slot_capacity: Option<u32>,
    /// Empty means any slot may be booked
    #[schema(value_type = Vec<String>, example = json!(["09:00", "09:30"]))]
    pub consultation_slots: Vec<TimeSlot>,
    pub consultation_fee: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDoctor {
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub slot_capacity: Option<u32>,
    pub consultation_slots: Vec<TimeSlot>,
    pub consultation_fee: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub slot_capacity: Option<u32>,
    #[schema(value_type = Option<Vec<String>>)]
    pub consultation_slots: Option<Vec<TimeSlot>>,
    pub consultation_fee: Option<i64>,
    pub is_active: Option<bool>,
}

impl Doctor {
    pub fn from_new(hospital_id: Uuid, user_id: Uuid, name: String, new: NewDoctor) -> Self {
        let now = Utc::now();
        let mut consultation_slots = new.consultation_slots;
        consultation_slots.sort();
        consultation_slots.dedup();

        Self {
            id: Uuid::new_v4(),
            hospital_id,
            user_id,
            initials: doctor_initials(&name),
            name,
            specialization: new.specialization,
            qualification: new.qualification,
            slot_capacity: new.slot_capacity,
            consultation_slots,
            consultation_fee: new.consultation_fee,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The booking-relevant view of this doctor
    pub fn schedule(&self) -> DoctorSchedule {
        DoctorSchedule {
            initials: self.initials.clone(),
            active: self.is_active,
            slot_capacity: self.slot_capacity,
            consultation_slots: self.consultation_slots.clone(),
        }
    }

    pub fn apply(&mut self, update: DoctorUpdate) {
        if let Some(name) = update.name {
            self.initials = doctor_initials(&name);
            self.name = name;
        }
        if update.specialization.is_some() {
            self.specialization = update.specialization;
        }
        if update.qualification.is_some() {
            self.qualification = update.qualification;
        }
        if update.slot_capacity.is_some() {
            self.slot_capacity = update.slot_capacity;
        }
        if let Some(mut slots) = update.consultation_slots {
            slots.sort();
            slots.dedup();
            self.consultation_slots = slots;
        }
        if update.consultation_fee.is_some() {
            self.consultation_fee = update.consultation_fee;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = Utc::now();
    }

    /// Whether `id` names this doctor or its user account
    pub fn matches(&self, id: Uuid) -> bool {
        self.id == id || self.user_id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_doctor_derives_initials_and_sorts_slots() {
        let doctor = Doctor::from_new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Dr. Asha Rao".to_string(),
            NewDoctor {
                consultation_slots: vec![slot("10:00"), slot("09:00"), slot("10:00")],
                ..NewDoctor::default()
            },
        );
        assert_eq!(doctor.initials, "AR");
        assert_eq!(doctor.consultation_slots, vec![slot("09:00"), slot("10:00")]);
        assert!(doctor.schedule().active);
    }

    #[test]
    fn test_rename_updates_initials() {
        let mut doctor = Doctor::from_new(Uuid::new_v4(), Uuid::new_v4(), "Asha Rao".to_string(), NewDoctor::default());
        doctor.apply(DoctorUpdate {
            name: Some("Dr Meera Iyer".to_string()),
            ..DoctorUpdate::default()
        });
        assert_eq!(doctor.initials, "MI");
        assert_eq!(doctor.name, "Dr Meera Iyer");
    }

    #[test]
    fn test_matches_doctor_or_user_id() {
        let doctor = Doctor::from_new(Uuid::new_v4(), Uuid::new_v4(), "Asha Rao".to_string(), NewDoctor::default());
        assert!(doctor.matches(doctor.id));
        assert!(doctor.matches(doctor.user_id));
        assert!(!doctor.matches(Uuid::new_v4()));
    }
}
