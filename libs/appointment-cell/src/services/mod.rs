pub mod availability;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod slots;

pub use availability::SlotService;
pub use booking::BookingService;
pub use conflict::{appointments_overlap, ConflictDetectionService, ConflictScope};
pub use lifecycle::AppointmentLifecycleService;
pub use slots::{fits_within_frames, generate_slots, merge_frames};
