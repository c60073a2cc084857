//! # CPA Sync
//!
//! Keeps the authoritative CPA repository in step with a file share and
//! activates quarantined CPAs once their scheduled release time passes.
//!
//! - [`quarantine`]: which quarantine files are due
//! - [`inventory`]: snapshot of the active files on the share
//! - [`reconcile`]: diff against the repository and apply it
//! - [`activation`]: rename plus archive promotion of due files
//! - [`service`]: the session-scoped top-level operations
//! - [`runtime`]: periodic timers

#![forbid(unsafe_code)]

pub mod activation;
pub mod config;
pub mod inventory;
pub mod quarantine;
pub mod reconcile;
pub mod runtime;
pub mod service;

pub use activation::{
    reference_token, ActivationOutcome, ActivationReport, ActivationState, Activator, Promotion,
};
pub use config::{ActivationFileMode, CpaSyncConfig, DuePolicy, ScheduleConfig};
pub use inventory::{build_inventory, Inventory};
pub use quarantine::QuarantineScheduler;
pub use reconcile::{apply_plan, plan_reconciliation, SyncPlan, SyncReport};
pub use runtime::CpaScheduler;
pub use service::CpaSyncService;
