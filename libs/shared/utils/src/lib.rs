pub mod audit;
pub mod datetime;
pub mod extractor;
pub mod names;
pub mod pesel;
pub mod signed_cookie;
pub mod test_utils;

pub use extractor::session_middleware;
