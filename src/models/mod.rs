pub mod price_reading;
pub mod run_result;
pub mod watch_entry;

// Re-exports for convenience
pub use price_reading::*;
pub use run_result::*;
pub use watch_entry::*;
