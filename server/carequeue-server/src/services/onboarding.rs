//! Hospital registration and staff accounts

use booking_engine::TimeSlot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::password::{generate_temporary_password, validate_strength};
use crate::auth::{IssuedToken, JwtService, PasswordService};
use crate::error::{ApiError, ApiResult};
use crate::logging::mask_email;
use crate::models::{Doctor, Hospital, NewDoctor, NewHospital, NewUser, Role, User};
use crate::notifications::{credentials_email, deliver, Mailer};
use crate::server::CareQueueServer;
use crate::store::{ClinicStore, DoctorRepository, HospitalRepository, UserRepository};
use crate::validation::{looks_like_phone, RequestValidation};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterHospitalRequest {
    #[schema(example = "City Care Clinic")]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_phone: Option<String>,
}

impl RequestValidation for RegisterHospitalRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.name, "Hospital name is required");
        crate::validate_length!(self.name, 2, 200, "Hospital name must be between 2 and 200 characters");
        crate::validate_optional_email!(self.email, "Invalid hospital email format");
        crate::validate_required!(self.admin_name, "Admin name is required");
        crate::validate_email!(self.admin_email, "Invalid admin email format");
        validate_strength(&self.admin_password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HospitalRegistration {
    pub hospital: Hospital,
    pub admin: User,
    pub token: IssuedToken,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDoctorRequest {
    #[schema(example = "Dr. Asha Rao")]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub slot_capacity: Option<u32>,
    #[serde(default)]
    #[schema(example = json!(["09:00", "09:30", "10:00"]))]
    pub consultation_slots: Vec<String>,
    pub consultation_fee: Option<i64>,
}

impl RequestValidation for CreateDoctorRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.name, "Doctor name is required");
        crate::validate_email!(self.email, "Invalid email format");
        if let Some(phone) = &self.phone {
            crate::validate_field!(phone, looks_like_phone(phone), "Invalid phone number");
        }
        if let Some(capacity) = self.slot_capacity {
            crate::validate_range!(capacity, 1, 100, "Slot capacity must be between 1 and 100");
        }
        if let Some(fee) = self.consultation_fee {
            crate::validate_field!(fee, fee >= 0, "Consultation fee cannot be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Receptionist")]
    pub designation: Option<String>,
}

impl RequestValidation for CreateStaffRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.name, "Name is required");
        crate::validate_email!(self.email, "Invalid email format");
        if let Some(phone) = &self.phone {
            crate::validate_field!(phone, looks_like_phone(phone), "Invalid phone number");
        }
        Ok(())
    }
}

/// A new account and how its credentials reached the user
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnboardedUser {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
    /// Present only when the credentials could not be emailed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
    pub credentials_emailed: bool,
}

pub struct OnboardingService {
    store: Arc<dyn ClinicStore>,
    mailer: Arc<dyn Mailer>,
    passwords: PasswordService,
    jwt: JwtService,
}

impl OnboardingService {
    pub fn new(store: Arc<dyn ClinicStore>, mailer: Arc<dyn Mailer>, passwords: PasswordService, jwt: JwtService) -> Self {
        Self {
            store,
            mailer,
            passwords,
            jwt,
        }
    }

    pub fn from_state(state: &CareQueueServer) -> Self {
        Self::new(
            state.store.clone(),
            state.mailer.clone(),
            state.passwords.clone(),
            state.jwt.clone(),
        )
    }

    pub async fn register_hospital(&self, request: RegisterHospitalRequest) -> ApiResult<HospitalRegistration> {
        request.validate()?;
        let password_hash = self.passwords.hash(&request.admin_password)?;

        let (hospital, admin) = self
            .store
            .register_hospital(
                NewHospital {
                    name: request.name.trim().to_string(),
                    address: request.address,
                    phone: request.phone,
                    email: request.email,
                },
                NewUser {
                    hospital_id: Uuid::nil(),
                    name: request.admin_name.trim().to_string(),
                    email: request.admin_email,
                    phone: request.admin_phone,
                    role: Role::HospitalAdmin,
                    designation: None,
                    password_hash,
                    must_change_password: false,
                },
            )
            .await?;

        let token = self.jwt.issue(&admin)?;
        tracing::info!(hospital_id = %hospital.id, code = %hospital.code, "hospital registered");

        Ok(HospitalRegistration { hospital, admin, token })
    }

    pub async fn create_doctor(&self, hospital_id: Uuid, request: CreateDoctorRequest) -> ApiResult<OnboardedUser> {
        request.validate()?;
        let consultation_slots = request
            .consultation_slots
            .iter()
            .map(|slot| slot.parse::<TimeSlot>())
            .collect::<Result<Vec<_>, _>>()?;

        let temporary_password = generate_temporary_password();
        let user = self.new_account(
            hospital_id,
            request.name,
            request.email,
            request.phone,
            Role::Doctor,
            None,
            &temporary_password,
        )?;

        let (user, doctor) = self
            .store
            .create_doctor(
                user,
                NewDoctor {
                    specialization: request.specialization,
                    qualification: request.qualification,
                    slot_capacity: request.slot_capacity,
                    consultation_slots,
                    consultation_fee: request.consultation_fee,
                },
            )
            .await?;
        tracing::info!(doctor_id = %doctor.id, initials = %doctor.initials, "doctor onboarded");

        let temporary_password = self.deliver_credentials(&user, temporary_password).await;
        Ok(OnboardedUser {
            credentials_emailed: temporary_password.is_none(),
            user,
            doctor: Some(doctor),
            temporary_password,
        })
    }

    pub async fn create_staff(&self, hospital_id: Uuid, request: CreateStaffRequest) -> ApiResult<OnboardedUser> {
        request.validate()?;
        let temporary_password = generate_temporary_password();
        let user = self.new_account(
            hospital_id,
            request.name,
            request.email,
            request.phone,
            Role::Staff,
            request.designation,
            &temporary_password,
        )?;

        let user = self.store.create_user(user).await?;
        tracing::info!(user_id = %user.id, "staff member onboarded");

        let temporary_password = self.deliver_credentials(&user, temporary_password).await;
        Ok(OnboardedUser {
            credentials_emailed: temporary_password.is_none(),
            user,
            doctor: None,
            temporary_password,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn new_account(
        &self,
        hospital_id: Uuid,
        name: String,
        email: String,
        phone: Option<String>,
        role: Role,
        designation: Option<String>,
        temporary_password: &str,
    ) -> ApiResult<NewUser> {
        Ok(NewUser {
            hospital_id,
            name: name.trim().to_string(),
            email,
            phone,
            role,
            designation,
            password_hash: self.passwords.hash(temporary_password)?,
            must_change_password: true,
        })
    }

    /// Email the credentials; hands the password back when that is not possible
    async fn deliver_credentials(&self, user: &User, temporary_password: String) -> Option<String> {
        if !self.mailer.delivers() {
            return Some(temporary_password);
        }
        let hospital = match self.store.get_hospital(user.hospital_id).await {
            Ok(Some(hospital)) => hospital,
            _ => return Some(temporary_password),
        };
        if deliver(self.mailer.as_ref(), credentials_email(user, &hospital, &temporary_password)).await {
            None
        } else {
            tracing::warn!(to = %mask_email(&user.email), "returning temporary password after email failure");
            Some(temporary_password)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::notifications::{MockMailer, NotificationError};
    use crate::store::MemoryStore;

    fn service(mailer: MockMailer) -> OnboardingService {
        let settings = AuthSettings {
            password_memory_kib: 1024,
            password_iterations: 1,
            ..AuthSettings::default()
        };
        OnboardingService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(mailer),
            PasswordService::new(&settings).unwrap(),
            JwtService::new(&settings),
        )
    }

    fn registration(email: &str) -> RegisterHospitalRequest {
        RegisterHospitalRequest {
            name: "City Care Clinic".to_string(),
            address: None,
            phone: None,
            email: None,
            admin_name: "Meera Iyer".to_string(),
            admin_email: email.to_string(),
            admin_password: "clinic2026".to_string(),
            admin_phone: None,
        }
    }

    fn doctor_request() -> CreateDoctorRequest {
        CreateDoctorRequest {
            name: "Dr. Asha Rao".to_string(),
            email: "asha@citycare.test".to_string(),
            phone: None,
            specialization: Some("General Medicine".to_string()),
            qualification: None,
            slot_capacity: None,
            consultation_slots: vec!["10:00".to_string(), "09:30".to_string()],
            consultation_fee: Some(500),
        }
    }

    #[tokio::test]
    async fn test_register_then_duplicate_email() {
        let mut mailer = MockMailer::new();
        mailer.expect_delivers().return_const(false);
        let service = service(mailer);

        let registered = service.register_hospital(registration("meera@citycare.test")).await.unwrap();
        assert_eq!(registered.hospital.code, "CITYCARE");
        assert_eq!(registered.admin.role, Role::HospitalAdmin);
        assert!(!registered.token.access_token.is_empty());

        let duplicate = service.register_hospital(registration("MEERA@citycare.test")).await;
        assert!(matches!(duplicate, Err(ApiError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_weak_admin_password_rejected() {
        let mut mailer = MockMailer::new();
        mailer.expect_delivers().return_const(false);
        let service = service(mailer);

        let mut request = registration("meera@citycare.test");
        request.admin_password = "short".to_string();
        assert!(matches!(
            service.register_hospital(request).await,
            Err(ApiError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_doctor_password_returned_without_email() {
        let mut mailer = MockMailer::new();
        mailer.expect_delivers().return_const(false);
        mailer.expect_send().never();
        let service = service(mailer);
        let hospital = service.register_hospital(registration("meera@citycare.test")).await.unwrap();

        let onboarded = service.create_doctor(hospital.hospital.id, doctor_request()).await.unwrap();
        let doctor = onboarded.doctor.unwrap();
        assert_eq!(doctor.initials, "AR");
        assert_eq!(doctor.consultation_slots[0].to_string(), "09:30");
        assert!(onboarded.user.must_change_password);
        assert!(!onboarded.credentials_emailed);

        let password = onboarded.temporary_password.unwrap();
        let hash = service.store.password_hash(onboarded.user.id).await.unwrap().unwrap();
        assert!(service.passwords.verify(&password, &hash).is_ok());
    }

    #[tokio::test]
    async fn test_staff_credentials_emailed() {
        let mut mailer = MockMailer::new();
        mailer.expect_delivers().return_const(true);
        mailer
            .expect_send()
            .withf(|message| message.to_email == "desk@citycare.test" && message.body.contains("Temporary password"))
            .times(1)
            .returning(|_| Ok(()));
        let service = service(mailer);
        let hospital = service.register_hospital(registration("meera@citycare.test")).await.unwrap();

        let onboarded = service
            .create_staff(
                hospital.hospital.id,
                CreateStaffRequest {
                    name: "Front Desk".to_string(),
                    email: "desk@citycare.test".to_string(),
                    phone: None,
                    designation: Some("Receptionist".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(onboarded.credentials_emailed);
        assert!(onboarded.temporary_password.is_none());
        assert_eq!(onboarded.user.role, Role::Staff);
    }

    #[tokio::test]
    async fn test_email_failure_falls_back_to_password() {
        let mut mailer = MockMailer::new();
        mailer.expect_delivers().return_const(true);
        mailer
            .expect_send()
            .returning(|_| Err(NotificationError::Send("rejected".to_string())));
        let service = service(mailer);
        let hospital = service.register_hospital(registration("meera@citycare.test")).await.unwrap();

        let onboarded = service.create_doctor(hospital.hospital.id, doctor_request()).await.unwrap();
        assert!(!onboarded.credentials_emailed);
        assert!(onboarded.temporary_password.is_some());
    }
}
