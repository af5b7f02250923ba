pub mod pool;
pub mod queue;
pub mod state;

pub use pool::{connect, connect_lazy, run_migrations};
pub use queue::{EmailJob, EmailQueue, EmailQueueError, JobStatus, QueueCounts, SendEmailJob, SendEmailResult};
pub use state::AppState;
