//! Application layer for Nox.
//!
//! Use cases that drive the domain types in `nox-core` against the chat
//! platform: taking applications, deciding on them, and the background tasks
//! that clean up after both.

pub mod decision;
pub mod intake;
pub mod scheduler;
pub mod sweeper;

pub use decision::{DecisionReport, DecisionService};
pub use intake::{ApplicationService, ProvisionOutcome};
pub use scheduler::{DeletionScheduler, PendingDeletion};
pub use sweeper::SweeperHandle;
