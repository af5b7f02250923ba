use sqlx::postgres::PgDatabaseError;

#[derive(Debug, Clone, PartialEq)]
pub struct DbErrorInfo {
    pub code: Option<String>,
    pub message: String,
}

pub const UNEXPECTED_ERROR: &str = "Wystąpił nieoczekiwany błąd.";

/// Translates Postgres SQLSTATE codes into user-facing Polish messages.
pub fn map_db_error(err: &sqlx::Error) -> DbErrorInfo {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string());
            let column = db_err
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.column())
                .map(str::to_string);
            let message = message_for_code(code.as_deref(), column.as_deref(), db_err.message());
            DbErrorInfo { code, message }
        }
        sqlx::Error::RowNotFound => DbErrorInfo {
            code: None,
            message: "Nie znaleziono rekordu.".to_string(),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => DbErrorInfo {
            code: Some("08006".to_string()),
            message: message_for_code(Some("08006"), None, ""),
        },
        _ => DbErrorInfo {
            code: None,
            message: UNEXPECTED_ERROR.to_string(),
        },
    }
}

pub fn message_for_code(code: Option<&str>, column: Option<&str>, raw: &str) -> String {
    match code {
        Some("23505") => "Znaleziono zduplikowany wpis dla unikalnego pola.".to_string(),
        Some("23503") => "Wystąpiło naruszenie klucza obcego. Rekord, do którego próbujesz się odwołać, nie istnieje.".to_string(),
        Some("22P02") => "Podane dane mają nieprawidłowy format (np. nieprawidłowy UUID).".to_string(),
        Some("23514") => "Naruszono ograniczenie sprawdzające.".to_string(),
        Some("23502") => format!(
            "Brakuje wymaganego pola. Kolumna '{}' nie może być pusta.",
            column.unwrap_or("nieznana")
        ),
        Some("42703") => "W zapytaniu odwołano się do niezdefiniowanej kolumny.".to_string(),
        Some("42601") => "Wystąpił błąd składni w zapytaniu do bazy danych.".to_string(),
        Some("25000") => "Transakcja nie powiodła się: wystąpił problem z integralnością danych w transakcji bazodanowej.".to_string(),
        Some("08006") => "Połączenie z bazą danych nie powiodło się. Baza danych może być niedostępna.".to_string(),
        Some("42P01") => "Wskazana tabela nie istnieje w bazie danych.".to_string(),
        Some("40001") => "Błąd serializacji transakcji. Proszę ponowić transakcję, ponieważ nie mogła zostać ukończona z powodu równoczesnych modyfikacji.".to_string(),
        _ => format!("Wystąpił błąd bazy danych: {}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_message() {
        assert_eq!(
            message_for_code(Some("23505"), None, "duplicate key"),
            "Znaleziono zduplikowany wpis dla unikalnego pola."
        );
    }

    #[test]
    fn not_null_violation_names_column() {
        assert_eq!(
            message_for_code(Some("23502"), Some("address"), ""),
            "Brakuje wymaganego pola. Kolumna 'address' nie może być pusta."
        );
    }

    #[test]
    fn unknown_code_includes_driver_message() {
        assert_eq!(
            message_for_code(Some("XX000"), None, "boom"),
            "Wystąpił błąd bazy danych: boom"
        );
    }

    #[test]
    fn pool_timeout_is_reported_as_connection_failure() {
        let info = map_db_error(&sqlx::Error::PoolTimedOut);
        assert_eq!(info.code.as_deref(), Some("08006"));
    }
}
