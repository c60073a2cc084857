//! CPA sync service
//!
//! Owns the collaborators and runs the two top-level operations:
//! - [`CpaSyncService::sync`]: optional activation, then reconciliation
//! - [`CpaSyncService::activate_pending`]: activation on its own
//!
//! Each call opens exactly one file-store session and closes it on every
//! exit path. Failures are logged here, with the transport code when the
//! transport reported one, and then returned to the caller.

use cpa_core::effects::{ArchiveEffects, FileStoreEffects, FileStoreSession, PhysicalTimeEffects, RepositoryEffects};
use cpa_core::{CpaError, CpaResult};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::activation::{ActivationReport, Activator};
use crate::config::CpaSyncConfig;
use crate::inventory::build_inventory;
use crate::reconcile::{apply_plan, plan_reconciliation, SyncReport};

/// Synchronizes the file store with the CPA repository
pub struct CpaSyncService<F, R, A, C> {
    config: CpaSyncConfig,
    file_store: Arc<F>,
    repository: Arc<R>,
    archive: Arc<A>,
    clock: Arc<C>,
}

impl<F, R, A, C> CpaSyncService<F, R, A, C>
where
    F: FileStoreEffects,
    R: RepositoryEffects,
    A: ArchiveEffects,
    C: PhysicalTimeEffects,
{
    /// Create a service over validated `config`
    pub fn new(
        config: CpaSyncConfig,
        file_store: Arc<F>,
        repository: Arc<R>,
        archive: Arc<A>,
        clock: Arc<C>,
    ) -> CpaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            file_store,
            repository,
            archive,
            clock,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CpaSyncConfig {
        &self.config
    }

    fn activator(&self) -> Activator<'_, A, C> {
        Activator::new(&*self.archive, &*self.clock, &self.config)
    }

    /// Run one sync: activation (when folded into sync), repository
    /// snapshot, inventory, then upserts and deletes.
    pub async fn sync(&self) -> CpaResult<SyncReport> {
        info!(directory = %self.config.directory, "Starting CPA sync");
        let session = self.connect().await?;
        let result = self.sync_with_session(&session).await;
        let result = finish_session(session, result).await;
        match &result {
            Ok(report) => info!(
                upserted = report.upserted.len(),
                deleted = report.deleted.len(),
                unchanged = report.unchanged.len(),
                "CPA sync finished"
            ),
            Err(err) => log_failure("CPA sync", err),
        }
        result
    }

    /// Activate due quarantine files in a session of its own
    pub async fn activate_pending(&self) -> CpaResult<ActivationReport> {
        let session = self.connect().await?;
        let result = self.activator().run(&session).await;
        let result = finish_session(session, result).await;
        match &result {
            Ok(report) => info!(
                due = report.outcomes.len(),
                promoted = report.promoted_count(),
                failed = report.failed_count(),
                "Quarantine activation finished"
            ),
            Err(err) => log_failure("Quarantine activation", err),
        }
        result
    }

    async fn connect(&self) -> CpaResult<F::Session> {
        self.file_store.connect().await.map_err(|err| {
            log_failure("File store connect", &err);
            err
        })
    }

    async fn sync_with_session(&self, session: &F::Session) -> CpaResult<SyncReport> {
        let activation = if self.config.activate_during_sync {
            Some(self.activator().run(session).await?)
        } else {
            None
        };

        let snapshot = self.repository.timestamps().await?;
        let inventory = build_inventory(session, &self.config.directory).await?;
        let plan = plan_reconciliation(&inventory, &snapshot)?;

        let mut report = apply_plan(&*self.repository, &plan).await?;
        report.activation = activation;
        Ok(report)
    }
}

/// Close `session`; a close failure only surfaces if the run succeeded
async fn finish_session<S: FileStoreSession, T>(session: S, result: CpaResult<T>) -> CpaResult<T> {
    match (session.close().await, result) {
        (Ok(()), result) => result,
        (Err(close_err), Ok(_)) => Err(close_err),
        (Err(close_err), Err(err)) => {
            warn!(error = %close_err, "Failed to close file-store session");
            Err(err)
        }
    }
}

fn log_failure(operation: &str, err: &CpaError) {
    let fatal = err.is_fatal_for_run();
    match err.transport_code() {
        Some(code) => error!(operation, code, fatal, error = %err, "Transport failure"),
        None => error!(operation, fatal, error = %err, "Operation failed"),
    }
}
