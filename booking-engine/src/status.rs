use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::BookingError;

/// Appointment lifecycle
///
/// ```text
/// booked ──► checked_in ──► in_consultation ──► completed
///   │            │
///   ├────────────┴──► cancelled
///   └────────────┴──► no_show
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    CheckedIn,
    InConsultation,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Booked,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InConsultation,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::CheckedIn => "checked_in",
            AppointmentStatus::InConsultation => "in_consultation",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Counts toward slot capacity and appears in the queue
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// Still waiting to be seen
    pub fn is_waiting(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::CheckedIn)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (*self, next),
            (Booked, CheckedIn)
                | (CheckedIn, InConsultation)
                | (InConsultation, Completed)
                | (Booked | CheckedIn, Cancelled)
                | (Booked | CheckedIn, NoShow)
        )
    }

    /// Validate a move to `next`, returning the new status
    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus, BookingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BookingError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BookingError::InvalidStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::AppointmentStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        let status = Booked.transition(CheckedIn).unwrap();
        let status = status.transition(InConsultation).unwrap();
        let status = status.transition(Completed).unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn test_cancel_only_before_consultation() {
        assert!(Booked.can_transition_to(Cancelled));
        assert!(CheckedIn.can_transition_to(Cancelled));
        assert!(!InConsultation.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Completed, Cancelled, NoShow] {
            for next in AppointmentStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_skipping_check_in_is_rejected() {
        let err = Booked.transition(InConsultation).unwrap_err();
        assert_eq!(
            err,
            BookingError::InvalidTransition {
                from: Booked,
                to: InConsultation
            }
        );
    }

    #[test]
    fn test_only_cancelled_is_inactive() {
        let inactive: Vec<_> = AppointmentStatus::ALL
            .into_iter()
            .filter(|s| !s.is_active())
            .collect();
        assert_eq!(inactive, vec![Cancelled]);
    }

    #[test]
    fn test_string_forms() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&InConsultation).unwrap(),
            "\"in_consultation\""
        );
        assert!("done".parse::<AppointmentStatus>().is_err());
    }
}
