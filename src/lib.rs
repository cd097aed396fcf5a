pub mod browser;
pub mod config;
pub mod fetcher;
pub mod ledger;
pub mod models;
pub mod plugins;
pub mod runner;
pub mod scheduler;
pub mod utils;
pub mod watchlist;

// Re-export commonly used types
pub use config::AppConfig;
pub use runner::BatchRunner;
pub use utils::error::{AppError, Result};
