use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Shorter working days are recorded as half days
pub const HALF_DAY_THRESHOLD_HOURS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::HalfDay => "half_day",
        }
    }

    pub fn for_worked(worked: Duration) -> Self {
        if worked < Duration::hours(HALF_DAY_THRESHOLD_HOURS) {
            AttendanceStatus::HalfDay
        } else {
            AttendanceStatus::Present
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "half_day" => Ok(AttendanceStatus::HalfDay),
            other => Err(format!("unknown attendance status '{other}'")),
        }
    }
}

/// One user's working day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attendance {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    pub fn check_in(hospital_id: Uuid, user_id: Uuid, date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hospital_id,
            user_id,
            date,
            check_in: at,
            check_out: None,
            status: AttendanceStatus::Present,
            created_at: at,
            updated_at: at,
        }
    }

    /// Close the day. Callers check `check_out` is unset first.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.check_out = Some(at);
        self.status = AttendanceStatus::for_worked(at - self.check_in);
        self.updated_at = at;
    }

    pub fn within(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |from| self.date >= from) && to.map_or(true, |to| self.date <= to)
    }
}
