//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use storage::sqlite::SqliteInitError;

/// Fatal outcomes of [`crate::ProgressSync::init`].
///
/// Everything else the synchronizer does degrades instead of failing, so this
/// is deliberately small. Cloneable because the init outcome is latched and
/// handed to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("remote store or identity provider is not configured")]
    RemoteUnavailable,
    #[error("synchronizer was shut down")]
    ShutDown,
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors emitted while bootstrapping the synchronizer's backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
