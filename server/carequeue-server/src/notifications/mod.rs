//! Outgoing email
//!
//! Handlers talk to a [`Mailer`]. With email disabled the [`LogMailer`]
//! records what would have been sent and reports that nothing was delivered,
//! so callers can fall back (for example by returning a temporary password).

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

use crate::logging::mask_email;
use crate::models::{Appointment, Doctor, Hospital, Patient, User};

pub use smtp::SmtpMailer;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("SMTP connection failed: {0}")]
    Connection(String),

    #[error("Failed to send email: {0}")]
    Send(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether messages actually leave the server
    fn delivers(&self) -> bool;

    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Mailer used when email is disabled
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn delivers(&self) -> bool {
        false
    }

    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %mask_email(&message.to_email),
            subject = %message.subject,
            "email disabled, message not sent"
        );
        Ok(())
    }
}

/// Send and log the outcome. Never fails the caller.
pub async fn deliver(mailer: &dyn Mailer, message: EmailMessage) -> bool {
    let to = mask_email(&message.to_email);
    let subject = message.subject.clone();
    match mailer.send(message).await {
        Ok(()) => {
            tracing::debug!(to = %to, subject = %subject, "email sent");
            true
        }
        Err(e) => {
            tracing::warn!(to = %to, subject = %subject, error = %e, "email delivery failed");
            false
        }
    }
}

pub fn credentials_email(user: &User, hospital: &Hospital, temporary_password: &str) -> EmailMessage {
    EmailMessage {
        to_name: user.name.clone(),
        to_email: user.email.clone(),
        subject: format!("Your {} account", hospital.name),
        body: format!(
            "Hello {name},\n\n\
             An account has been created for you at {hospital} ({code}).\n\n\
             Email: {email}\n\
             Temporary password: {password}\n\n\
             You will be asked to change this password after your first login.\n",
            name = user.name,
            hospital = hospital.name,
            code = hospital.code,
            email = user.email,
            password = temporary_password,
        ),
    }
}

/// Confirmation for a new booking, if the patient has an email address
pub fn booking_confirmation(
    appointment: &Appointment,
    patient: &Patient,
    doctor: &Doctor,
    hospital: &Hospital,
) -> Option<EmailMessage> {
    let to_email = patient.email.as_ref().filter(|email| !email.trim().is_empty())?;
    Some(EmailMessage {
        to_name: patient.name.clone(),
        to_email: to_email.clone(),
        subject: format!("Appointment confirmed: token {}", appointment.token),
        body: format!(
            "Hello {name},\n\n\
             Your appointment at {hospital} is booked.\n\n\
             Doctor: {doctor}\n\
             Date: {date}\n\
             Time: {slot}\n\
             Token: {token}\n\n\
             Please show your token at the front desk when you arrive.\n",
            name = patient.name,
            hospital = hospital.name,
            doctor = doctor.name,
            date = appointment.appointment_date.format("%d %b %Y"),
            slot = appointment.time_slot,
            token = appointment.token,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingDraft, NewDoctor, NewHospital, NewPatient};
    use booking_engine::Token;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn fixtures(email: Option<&str>) -> (Appointment, Patient, Doctor, Hospital) {
        let hospital = Hospital::from_new(
            NewHospital {
                name: "City Care".to_string(),
                address: None,
                phone: None,
                email: None,
            },
            "CITYCARE".to_string(),
        );
        let doctor = Doctor::from_new(hospital.id, Uuid::new_v4(), "Dr. Asha Rao".to_string(), NewDoctor::default());
        let patient = Patient::from_new(
            hospital.id,
            NewPatient {
                name: "Kiran Shah".to_string(),
                phone: "9845012345".to_string(),
                email: email.map(str::to_string),
                age: None,
                gender: None,
                address: None,
            },
        );
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let appointment = Appointment::from_draft(
            BookingDraft {
                hospital_id: hospital.id,
                doctor_id: doctor.id,
                patient_id: patient.id,
                patient_name: patient.name.clone(),
                appointment_date: date,
                time_slot: "10:30".parse().unwrap(),
                reason: None,
                booked_by: None,
            },
            &Token::new(date, "AR", 4),
        );
        (appointment, patient, doctor, hospital)
    }

    #[test]
    fn test_confirmation_needs_patient_email() {
        let (appointment, patient, doctor, hospital) = fixtures(None);
        assert!(booking_confirmation(&appointment, &patient, &doctor, &hospital).is_none());

        let (appointment, patient, doctor, hospital) = fixtures(Some("kiran@example.com"));
        let message = booking_confirmation(&appointment, &patient, &doctor, &hospital).unwrap();
        assert_eq!(message.to_email, "kiran@example.com");
        assert!(message.subject.contains("20260309-AR-004"));
        assert!(message.body.contains("10:30"));
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(NotificationError::Send("mailbox unavailable".to_string())));

        let (appointment, patient, doctor, hospital) = fixtures(Some("kiran@example.com"));
        let message = booking_confirmation(&appointment, &patient, &doctor, &hospital).unwrap();
        assert!(!deliver(&mailer, message).await);
    }

    #[tokio::test]
    async fn test_deliver_reports_success() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|message| message.to_email == "kiran@example.com")
            .times(1)
            .returning(|_| Ok(()));

        let (appointment, patient, doctor, hospital) = fixtures(Some("kiran@example.com"));
        let message = booking_confirmation(&appointment, &patient, &doctor, &hospital).unwrap();
        assert!(deliver(&mailer, message).await);
    }

    #[tokio::test]
    async fn test_log_mailer_does_not_deliver() {
        let mailer = LogMailer;
        assert!(!mailer.delivers());
        let (appointment, patient, doctor, hospital) = fixtures(Some("kiran@example.com"));
        let message = booking_confirmation(&appointment, &patient, &doctor, &hospital).unwrap();
        assert!(mailer.send(message).await.is_ok());
    }
}
