pub mod health;
pub mod landing;

pub use health::HealthService;
pub use landing::LandingService;
