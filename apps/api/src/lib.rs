pub mod bootstrap;
pub mod openapi;
pub mod router;

pub use router::create_router;
