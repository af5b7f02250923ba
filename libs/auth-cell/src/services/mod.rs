pub mod accounts;
pub mod password;
pub mod registration;
pub mod tokens;

pub use accounts::{AccountService, NewAccount};
pub use password::PasswordService;
pub use registration::RegistrationService;
