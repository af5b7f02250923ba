pub mod facility;
pub mod overview;
pub mod staff;

pub use facility::FacilityService;
pub use overview::OverviewService;
pub use staff::{Invitation, StaffService};
