use std::sync::Arc;

use storage::Storage;
use storage::rest;
use storage::sqlite::SqliteLocalStore;
use tracing::{info, warn};

use crate::Clock;
use crate::config::SyncConfig;
use crate::connectivity::Connectivity;
use crate::error::AppServicesError;
use crate::progress_sync::ProgressSync;

/// Wires the synchronizer to its configured backends.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressSync>,
}

impl AppServices {
    /// Build services backed by `SQLite` and, when configured, the REST
    /// remote store.
    ///
    /// A missing remote configuration is not an error here; it surfaces when
    /// the synchronizer is initialized.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the local store cannot be opened or the
    /// remote adapters cannot be built.
    pub async fn from_config(config: &SyncConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let local = Arc::new(SqliteLocalStore::open(&config.db_url).await?);
        let storage = match &config.remote {
            Some(remote_config) => {
                let (remote, identity) = rest::connect(remote_config)?;
                info!(remote = %remote_config.database_url, "remote progress store configured");
                Storage {
                    local,
                    remote: Some(Arc::new(remote)),
                    identity: Some(Arc::new(identity)),
                }
            }
            None => {
                warn!("PROGRESS_REMOTE_URL or PROGRESS_API_KEY not set; remote sync unavailable");
                Storage::local_only(local)
            }
        };

        Ok(Self::new(
            clock,
            storage,
            Connectivity::new(config.start_online),
        ))
    }

    #[must_use]
    pub fn new(clock: Clock, storage: Storage, connectivity: Connectivity) -> Self {
        Self {
            progress: Arc::new(ProgressSync::new(clock, storage, connectivity)),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressSync> {
        Arc::clone(&self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DB_URL;

    #[tokio::test]
    async fn local_only_config_builds_but_refuses_init() {
        let config = SyncConfig {
            db_url: "sqlite:file:memdb_app_services?mode=memory&cache=shared".into(),
            remote: None,
            start_online: true,
        };
        assert_ne!(config.db_url, DEFAULT_DB_URL);

        let services = AppServices::from_config(&config, Clock::default_clock())
            .await
            .expect("services");
        let err = services.progress().init().await.unwrap_err();
        assert_eq!(err, crate::SyncError::RemoteUnavailable);
    }
}
