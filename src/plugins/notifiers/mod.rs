// Notifier implementations
pub mod log;
pub mod twilio;

pub use log::LogNotifier;
pub use twilio::TwilioNotifier;
