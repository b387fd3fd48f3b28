//! Consultation time slots
//!
//! A slot is the start time of a consultation, kept at minute precision.
//! Slots parse from 24-hour (`"14:30"`, `"14:30:00"`) or 12-hour
//! (`"2:30 PM"`) text and always print as `HH:MM`.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::BookingError;

const FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    /// Build a slot from a time, dropping seconds and sub-seconds
    pub fn new(time: NaiveTime) -> Self {
        let minute_precision = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        Self(minute_precision)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for TimeSlot {
    fn from(time: NaiveTime) -> Self {
        Self::new(time)
    }
}

impl FromStr for TimeSlot {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
            .map(Self::new)
            .ok_or_else(|| BookingError::InvalidSlot(trimmed.to_string()))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_24_hour() {
        let slot: TimeSlot = "09:05".parse().unwrap();
        assert_eq!(slot, TimeSlot::from_hm(9, 5).unwrap());
        assert_eq!(slot.to_string(), "09:05");
    }

    #[test]
    fn test_parse_drops_seconds() {
        let slot: TimeSlot = "14:30:59".parse().unwrap();
        assert_eq!(slot.to_string(), "14:30");
    }

    #[test]
    fn test_parse_12_hour() {
        let slot: TimeSlot = "2:30 PM".parse().unwrap();
        assert_eq!(slot, TimeSlot::from_hm(14, 30).unwrap());

        let slot: TimeSlot = "12:15am".parse().unwrap();
        assert_eq!(slot, TimeSlot::from_hm(0, 15).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "half past ten".parse::<TimeSlot>().unwrap_err();
        assert_eq!(err, BookingError::InvalidSlot("half past ten".to_string()));
        assert!("25:00".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn test_serde_uses_hh_mm() {
        let slot = TimeSlot::from_hm(8, 0).unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"08:00\"");

        let parsed: TimeSlot = serde_json::from_str("\"10:45 AM\"").unwrap();
        assert_eq!(parsed, TimeSlot::from_hm(10, 45).unwrap());

        assert!(serde_json::from_str::<TimeSlot>("\"soon\"").is_err());
    }

    #[test]
    fn test_ordering_follows_clock() {
        let mut slots: Vec<TimeSlot> = ["16:00", "09:30", "11:00"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        slots.sort();
        let printed: Vec<String> = slots.iter().map(ToString::to_string).collect();
        assert_eq!(printed, vec!["09:30", "11:00", "16:00"]);
    }
}
