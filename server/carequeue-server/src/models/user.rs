use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HospitalAdmin,
    Doctor,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HospitalAdmin => "hospital_admin",
            Role::Doctor => "doctor",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hospital_admin" => Ok(Role::HospitalAdmin),
            "doctor" => Ok(Role::Doctor),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Account profile. The password hash is kept by the store, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub designation: Option<String>,
    pub is_active: bool,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub hospital_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub designation: Option<String>,
    pub password_hash: String,
    pub must_change_password: bool,
}

impl User {
    /// Build the stored user; returns it with the hash that goes alongside
    pub fn from_new(new: NewUser) -> (Self, String) {
        let now = Utc::now();
        let user = Self {
            id: Uuid::new_v4(),
            hospital_id: new.hospital_id,
            name: new.name,
            email: normalize_email(&new.email),
            phone: new.phone,
            role: new.role,
            designation: new.designation,
            is_active: true,
            must_change_password: new.must_change_password,
            created_at: now,
            updated_at: now,
        };
        (user, new.password_hash)
    }
}

/// Emails are unique regardless of case
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
