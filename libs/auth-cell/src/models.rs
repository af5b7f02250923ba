use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::services::password::PasswordService;

pub const REGISTRATION_VALIDATION_FAILED: &str = "Błąd walidacji danych rejestracji.";
pub const EMAIL_TAKEN: &str = "Użytkownik o tym adresie email już istnieje.";
pub const PESEL_TAKEN: &str = "Pacjent o tym numerze PESEL już istnieje.";
pub const REGISTRATION_SUCCESS: &str =
    "Rejestracja powiodła się. Sprawdź swoją skrzynkę email, aby potwierdzić konto.";

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?\d+$").expect("valid phone regex"));

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(email(message = "Adres email jest wymagany."))]
    pub email: String,

    #[validate(length(min = 2, message = "Imię musi zawierać co najmniej 2 znaki."))]
    pub name: String,

    #[validate(length(min = 2, message = "Nazwisko musi zawierać co najmniej 2 znaki."))]
    pub surname: String,

    #[validate(
        length(equal = 11, message = "PESEL musi mieć dokładnie 11 znaków"),
        custom(function = "validate_digits", message = "PESEL musi składać się tylko z cyfr")
    )]
    pub pesel: String,

    #[validate(
        length(min = 9, max = 15, message = "Numer telefonu musi zawierać od 9 do 15 znaków."),
        regex(
            path = *PHONE_REGEX,
            message = "Numer telefonu może zawierać tylko cyfry i opcjonalny znak + na początku."
        )
    )]
    pub phone: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    #[validate(length(min = 5, message = "Adres musi zawierać co najmniej 5 znaków."))]
    pub address: String,
}

impl RegisterRequest {
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();
        self.surname = self.surname.trim().to_string();
        self.address = self.address.trim().to_string();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

fn validate_digits(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits"))
    }
}

fn validate_password(value: &str) -> Result<(), ValidationError> {
    match PasswordService::strength_issues(value).first() {
        None => Ok(()),
        Some(message) => Err(ValidationError::new("password").with_message((*message).into())),
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPatient {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub status: String,
    pub patient: RegisteredPatient,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub status: String,
    pub email_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::error::first_validation_message;

    fn valid() -> RegisterRequest {
        RegisterRequest {
            email: "jan@example.com".into(),
            name: "Jan".into(),
            surname: "Kowalski".into(),
            pesel: "90010112345".into(),
            phone: "+48123456789".into(),
            password: "Bardzo!Tajne123".into(),
            address: "ul. Długa 1, Gdańsk".into(),
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_non_digit_pesel() {
        let mut payload = valid();
        payload.pesel = "9001011234a".into();
        let errors = payload.validate().unwrap_err();
        assert_eq!(
            first_validation_message(&errors).as_deref(),
            Some("PESEL musi składać się tylko z cyfr")
        );
    }

    #[test]
    fn rejects_phone_with_letters() {
        let mut payload = valid();
        payload.phone = "12345abcd".into();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn password_message_names_the_rule() {
        let mut payload = valid();
        payload.password = "bardzo!tajne123".into();
        let errors = payload.validate().unwrap_err();
        assert_eq!(
            first_validation_message(&errors).as_deref(),
            Some("Hasło musi zawierać co najmniej jedną wielką literę.")
        );
    }

    #[test]
    fn normalization_trims_names() {
        let mut payload = valid();
        payload.name = "  Jan ".into();
        payload.surname = " K ".into();
        let normalized = payload.normalized();
        assert_eq!(normalized.full_name(), "Jan K");
        assert!(normalized.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = serde_json::json!({
            "email": "jan@example.com", "name": "Jan", "surname": "Kowalski",
            "pesel": "90010112345", "phone": "123456789", "password": "Bardzo!Tajne123",
            "address": "ul. Długa 1", "role": "admin"
        });
        assert!(serde_json::from_value::<RegisterRequest>(body).is_err());
    }
}
