//! Convoy conciliation engine — resolves duplicate running processes.
//!
//! When the same logical process is seen running on several nodes, a
//! conciliation strategy decides which instances to stop. Stops are
//! issued as intents through a [`convoy_core::ProcessController`];
//! delivering them to the node agents is the caller's concern.
//!
//! # Architecture
//!
//! ```text
//! instance snapshot
//!   └── detect_conflicts() → Vec<Conflict>
//!         └── conciliate(strategy)
//!               ├── SENICIDE / INFANTICIDE → stop all but one
//!               ├── STOP / RESTART         → stop all (RESTART marks for redeploy)
//!               └── USER                   → leave to the operator
//!                     └── ProcessController::request_stop() → StopQueue
//! ```

pub mod conflict;
pub mod queue;
pub mod strategy;

pub use conflict::detect_conflicts;
pub use queue::{StopIntent, StopQueue};
pub use strategy::{
    ConciliationReport, conciliate, infanticide, restart, senicide, stop_all, user,
};
