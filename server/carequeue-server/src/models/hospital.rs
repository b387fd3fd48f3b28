use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

const CODE_MAX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    /// Short unique code derived from the name
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHospital {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct HospitalUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Hospital {
    pub fn from_new(new: NewHospital, code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            code,
            address: new.address,
            phone: new.phone,
            email: new.email,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: HospitalUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        self.updated_at = Utc::now();
    }
}

/// Uppercase alphanumerics of the name, at most eight of them
pub fn hospital_code_base(name: &str) -> String {
    let base: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(CODE_MAX_LEN)
        .collect();

    if base.is_empty() {
        "HOSP".to_string()
    } else {
        base
    }
}

/// First of `BASE`, `BASE2`, `BASE3`, ... not in `taken`
pub fn next_free_code(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{base}-{}", Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_base() {
        assert_eq!(hospital_code_base("City Care Hospital"), "CITYCARE");
        assert_eq!(hospital_code_base("St. Mary's"), "STMARYS");
        assert_eq!(hospital_code_base("A1 Clinic"), "A1CLINIC");
        assert_eq!(hospital_code_base("---"), "HOSP");
    }

    #[test]
    fn test_next_free_code_appends_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(next_free_code("CITYCARE", &taken), "CITYCARE");

        taken.insert("CITYCARE".to_string());
        assert_eq!(next_free_code("CITYCARE", &taken), "CITYCARE2");

        taken.insert("CITYCARE2".to_string());
        assert_eq!(next_free_code("CITYCARE", &taken), "CITYCARE3");
    }
}
