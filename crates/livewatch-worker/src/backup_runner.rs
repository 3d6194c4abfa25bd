//! Cron job shipping remote backups.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use livewatch_core::config::BackupConfig;
use livewatch_core::error::AppError;
use livewatch_core::traits::BackupRef;
use livewatch_store::StateStore;

/// Calls [`StateStore::backup`] on the configured cron schedule,
/// independently of the polling cadence.
pub struct BackupRunner {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Store to back up
    store: Arc<StateStore>,
    /// Cron expression (with seconds)
    schedule: String,
}

impl std::fmt::Debug for BackupRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupRunner")
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl BackupRunner {
    /// Create a runner for the store.
    pub async fn new(store: Arc<StateStore>, config: &BackupConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create backup scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            store,
            schedule: config.schedule.clone(),
        })
    }

    /// Register the backup job and start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        let store = Arc::clone(&self.store);
        let job = CronJob::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let store = Arc::clone(&store);
            Box::pin(async move {
                tracing::debug!("Running scheduled backup");
                if let Some(backup) = store.backup().await {
                    tracing::debug!("Scheduled backup stored as '{}'", backup.name);
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid backup schedule '{}': {}",
                self.schedule, e
            ))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add backup schedule: {}", e)))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start backup scheduler: {}", e)))?;

        tracing::info!("Registered: backup ({})", self.schedule);
        Ok(())
    }

    /// Run a backup immediately.
    pub async fn run_once(&self) -> Option<BackupRef> {
        self.store.backup().await
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown backup scheduler: {}", e)))?;

        tracing::info!("Backup scheduler shut down");
        Ok(())
    }
}
