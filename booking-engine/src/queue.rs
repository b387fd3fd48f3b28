//! Daily queue view
//!
//! Lobby screens and front desks show each doctor's day as an ordered list
//! of tokens. Cancelled appointments are dropped; everything else keeps its
//! serial order so a patient's position never jumps backwards.

use serde::Serialize;
use uuid::Uuid;

use crate::{AppointmentStatus, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueTicket {
    pub appointment_id: Uuid,
    pub token: String,
    pub serial: u32,
    pub patient_name: String,
    pub time_slot: TimeSlot,
    pub status: AppointmentStatus,
    /// 1-based place in the day's queue, filled in by [`DoctorQueue::build`]
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorQueue {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub entries: Vec<QueueTicket>,
    pub now_serving: Option<QueueTicket>,
    pub next_up: Option<QueueTicket>,
    pub total: usize,
    pub waiting: usize,
    pub completed: usize,
}

impl DoctorQueue {
    pub fn build(
        doctor_id: Uuid,
        doctor_name: impl Into<String>,
        tickets: impl IntoIterator<Item = QueueTicket>,
    ) -> Self {
        let mut entries: Vec<QueueTicket> = tickets
            .into_iter()
            .filter(|ticket| ticket.status.is_active())
            .collect();
        entries.sort_by_key(|ticket| ticket.serial);

        for (position, ticket) in (1u32..).zip(entries.iter_mut()) {
            ticket.position = position;
        }

        let now_serving = entries
            .iter()
            .find(|ticket| ticket.status == AppointmentStatus::InConsultation)
            .cloned();
        let next_up = entries.iter().find(|ticket| ticket.status.is_waiting()).cloned();
        let waiting = entries.iter().filter(|ticket| ticket.status.is_waiting()).count();
        let completed = entries
            .iter()
            .filter(|ticket| ticket.status == AppointmentStatus::Completed)
            .count();

        Self {
            doctor_id,
            doctor_name: doctor_name.into(),
            total: entries.len(),
            entries,
            now_serving,
            next_up,
            waiting,
            completed,
        }
    }

    /// Replace patient names with a lobby-safe form
    pub fn mask_patient_names(mut self) -> Self {
        let mask = |ticket: &mut QueueTicket| ticket.patient_name = mask_name(&ticket.patient_name);
        self.entries.iter_mut().for_each(mask);
        self.now_serving.iter_mut().for_each(mask);
        self.next_up.iter_mut().for_each(mask);
        self
    }
}

/// First name plus the initial of the last name: `"Kiran Shah"` → `"Kiran S."`
pub fn mask_name(name: &str) -> String {
    let mut words = name.split_whitespace();
    match (words.next(), words.last()) {
        (Some(first), Some(last)) => match last.chars().next() {
            Some(initial) => format!("{first} {initial}."),
            None => first.to_string(),
        },
        (Some(first), None) => first.to_string(),
        _ => String::new(),
    }
}
