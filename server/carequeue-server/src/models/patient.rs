use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub name: String,
    /// Unique within a hospital
    pub phone: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPatient {
    #[schema(example = "Kiran Shah")]
    pub name: String,
    #[schema(example = "+91 98450 12345")]
    pub phone: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

impl Patient {
    pub fn from_new(hospital_id: Uuid, new: NewPatient) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hospital_id,
            name: new.name.trim().to_string(),
            phone: normalize_phone(&new.phone),
            email: new.email,
            age: new.age,
            gender: new.gender,
            address: new.address,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: PatientUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            self.phone = normalize_phone(&phone);
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        if update.age.is_some() {
            self.age = update.age;
        }
        if update.gender.is_some() {
            self.gender = update.gender;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive substring match on name or phone
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty() || self.name.to_lowercase().contains(&term) || self.phone.contains(&term)
    }
}

/// Keep digits and a leading `+` so "98450-12345" and "98450 12345" collide
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str, phone: &str) -> Patient {
        Patient::from_new(
            Uuid::new_v4(),
            NewPatient {
                name: name.to_string(),
                phone: phone.to_string(),
                email: None,
                age: None,
                gender: None,
                address: None,
            },
        )
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(" 98450-12345 "), "9845012345");
        assert_eq!(normalize_phone("+91 98450 12345"), "+919845012345");
    }

    #[test]
    fn test_search_matches_name_or_phone() {
        let p = patient("Kiran Shah", "98450 12345");
        assert!(p.matches_search("kiran"));
        assert!(p.matches_search("SHAH"));
        assert!(p.matches_search("4501"));
        assert!(p.matches_search(""));
        assert!(!p.matches_search("meera"));
    }
}
