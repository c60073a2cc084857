//! Periodic timers for sync and activation.
//!
//! Each timer waits the startup delay, then ticks at a fixed interval. A tick
//! awaits its run before the next tick is taken, so runs of the same timer
//! never overlap; missed ticks are delayed, not burst. Shutdown stops further
//! ticks but never interrupts a run in progress.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for JoinHandle storage: pushes on start, drains
//! on join, never held across `.await`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cpa_core::effects::{ArchiveEffects, FileStoreEffects, PhysicalTimeEffects, RepositoryEffects};
use cpa_core::{CpaError, CpaResult};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::service::CpaSyncService;

/// Drives a [`CpaSyncService`] on its configured schedule
#[derive(Debug)]
pub struct CpaScheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl CpaScheduler {
    /// Create a scheduler with no timers running
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start the sync timer, plus the standalone activation timer when
    /// activation is enabled and not already part of every sync.
    pub fn start<F, R, A, C>(&self, service: Arc<CpaSyncService<F, R, A, C>>) -> CpaResult<()>
    where
        F: FileStoreEffects + 'static,
        R: RepositoryEffects + 'static,
        A: ArchiveEffects + 'static,
        C: PhysicalTimeEffects + 'static,
    {
        let schedule = service.config().schedule.clone();
        let standalone_activation =
            schedule.activation_enabled && !service.config().activate_during_sync;

        let sync_service = Arc::clone(&service);
        self.spawn_timer(
            "sync",
            schedule.startup_delay(),
            schedule.sync_interval(),
            move || {
                let service = Arc::clone(&sync_service);
                async move { service.sync().await.map(|_| ()).map_err(|e| e.to_string()) }
            },
        )?;

        if standalone_activation {
            self.spawn_timer(
                "activation",
                schedule.startup_delay(),
                schedule.activation_interval(),
                move || {
                    let service = Arc::clone(&service);
                    async move {
                        service
                            .activate_pending()
                            .await
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                    }
                },
            )?;
        }
        Ok(())
    }

    /// Spawn a named timer running `task` on every tick.
    ///
    /// A zero `interval` is rejected and nothing is spawned.
    pub fn spawn_timer<T, Fut>(
        &self,
        name: &'static str,
        startup_delay: Duration,
        interval: Duration,
        mut task: T,
    ) -> CpaResult<()>
    where
        T: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(CpaError::config(format!("{name} interval must be positive")));
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if *shutdown_rx.borrow() {
                return;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => return,
                _ = tokio::time::sleep(startup_delay) => {}
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        info!(task = name, "Running task");
                        match task().await {
                            Ok(()) => info!(task = name, "Done"),
                            Err(err) => error!(task = name, error = %err, "Failed task"),
                        }
                    }
                }
            }
            info!(task = name, "Timer stopped");
        });
        self.handles.lock().push(handle);
        Ok(())
    }

    /// Stop issuing ticks. Runs in progress complete.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Signal shutdown and wait for every timer to finish its current run
    pub async fn shutdown_and_join(&self) {
        self.shutdown();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Number of timers started
    pub fn timer_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl Default for CpaScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CpaScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
