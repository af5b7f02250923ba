pub mod auth;
pub mod db_error;
pub mod error;

pub use error::AppError;
