pub const DEFAULT_PATIENT_NAME: &str = "Pacjent";
pub const DEFAULT_DOCTOR_NAME: &str = "Lekarz";

/// Prefers the profile's first and last name, then the account name, then `default`.
pub fn build_person_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    account_name: Option<&str>,
    default: &str,
) -> String {
    let full = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if !full.is_empty() {
        return full;
    }

    account_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_profile_names() {
        assert_eq!(
            build_person_name(Some("Anna"), Some("Nowak"), Some("anna"), DEFAULT_PATIENT_NAME),
            "Anna Nowak"
        );
        assert_eq!(
            build_person_name(None, Some("Nowak"), None, DEFAULT_PATIENT_NAME),
            "Nowak"
        );
    }

    #[test]
    fn falls_back_to_account_then_default() {
        assert_eq!(
            build_person_name(None, Some("  "), Some("Jan K."), DEFAULT_PATIENT_NAME),
            "Jan K."
        );
        assert_eq!(build_person_name(None, None, None, DEFAULT_DOCTOR_NAME), "Lekarz");
    }
}
