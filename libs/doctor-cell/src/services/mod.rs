pub mod dispositions;
pub mod visits;

pub use dispositions::DispositionService;
pub use visits::DoctorVisitService;
