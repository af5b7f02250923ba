use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::{distributions::Alphanumeric, Rng};
use tracing::instrument;

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Throwaway password for staff accounts; the owner sets a real one from the emailed link.
    pub fn generate_temporary_password() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    pub fn generate_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect()
    }

    /// Password rules for self-registration, one message per broken rule.
    pub fn strength_issues(password: &str) -> Vec<&'static str> {
        let mut issues = Vec::new();

        if password.chars().count() < 12 {
            issues.push("Hasło musi zawierać co najmniej 12 znaków.");
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            issues.push("Hasło musi zawierać co najmniej jedną wielką literę.");
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            issues.push("Hasło musi zawierać co najmniej jedną małą literę.");
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            issues.push("Hasło musi zawierać co najmniej jedną cyfrę.");
        }
        if password.chars().all(|c| c.is_ascii_alphanumeric()) {
            issues.push("Hasło musi zawierać co najmniej jeden znak specjalny.");
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = PasswordService::hash_password("Bardzo!Tajne123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(PasswordService::verify_password("Bardzo!Tajne123", &hash).unwrap());
        assert!(!PasswordService::verify_password("inne", &hash).unwrap());
    }

    #[test]
    fn temporary_passwords_are_random() {
        let a = PasswordService::generate_temporary_password();
        let b = PasswordService::generate_temporary_password();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn strength_rules() {
        assert!(PasswordService::strength_issues("Bardzo!Tajne123").is_empty());
        assert_eq!(
            PasswordService::strength_issues("bardzotajne123!"),
            vec!["Hasło musi zawierać co najmniej jedną wielką literę."]
        );
        assert_eq!(PasswordService::strength_issues("Ab1!").len(), 1);
        assert_eq!(
            PasswordService::strength_issues("BardzoTajne1234"),
            vec!["Hasło musi zawierać co najmniej jeden znak specjalny."]
        );
    }
}
