pub mod mailer;
pub mod notifier;
pub mod reminder;
pub mod worker;

pub use mailer::{MailTransport, SmtpMailer};
pub use notifier::Notifier;
pub use reminder::VisitReminderService;
pub use worker::EmailWorkerService;
