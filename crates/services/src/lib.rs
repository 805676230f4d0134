#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod progress_sync;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use config::SyncConfig;
pub use connectivity::Connectivity;
pub use error::{AppServicesError, ConfigError, SyncError};
pub use events::{ListenerHandle, ProgressEvent, SyncOperation};
pub use progress_sync::{CACHE_KEY, InitOutcome, PENDING_KEY, ProgressSync, ResyncOutcome};
