//! Daily appointment tokens
//!
//! A token identifies a patient's place in a doctor's queue for one day:
//! `YYYYMMDD-<DoctorInitials>-<Serial>`, for example `20260309-AR-007`.
//! Serials start at 1 per doctor per day and are zero-padded to three
//! digits; larger serials keep all their digits.

use chrono::NaiveDate;
use std::fmt;

const DATE_FORMAT: &str = "%Y%m%d";
const FALLBACK_INITIALS: &str = "DR";

/// Derive the initials printed in a doctor's tokens
///
/// A leading `Dr`/`Dr.` title is ignored; each remaining word contributes
/// its first letter.
pub fn doctor_initials(name: &str) -> String {
    let mut words = name.split_whitespace().peekable();
    if let Some(first) = words.peek() {
        let title = first.trim_end_matches('.');
        if title.eq_ignore_ascii_case("dr") || title.eq_ignore_ascii_case("doctor") {
            words.next();
        }
    }

    let initials: String = words
        .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        FALLBACK_INITIALS.to_string()
    } else {
        initials
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    date: NaiveDate,
    initials: String,
    serial: u32,
}

impl Token {
    pub fn new(date: NaiveDate, initials: impl Into<String>, serial: u32) -> Self {
        Self {
            date,
            initials: initials.into(),
            serial,
        }
    }

    /// The token following the highest serial already issued for the day
    pub fn next_after(date: NaiveDate, initials: impl Into<String>, max_serial: Option<u32>) -> Self {
        let serial = max_serial.map_or(1, |serial| serial.saturating_add(1));
        Self::new(date, initials, serial)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn initials(&self) -> &str {
        &self.initials
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:03}",
            self.date.format(DATE_FORMAT),
            self.initials,
            self.serial
        )
    }
}
