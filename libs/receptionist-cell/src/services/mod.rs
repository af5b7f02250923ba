pub mod front_desk;
pub mod rooms;
pub mod schedule;

pub use front_desk::FrontDeskService;
pub use rooms::RoomAssignmentService;
pub use schedule::ScheduleService;
