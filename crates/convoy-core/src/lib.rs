//! convoy-core — shared model for the Convoy decision engines.
//!
//! Holds the data model read by the placement and conciliation engines,
//! the collaborator traits they are driven through, and the fleet
//! configuration parser.
//!
//! # Components
//!
//! - **`types`** — Node states, loads, process instances, conflicts, strategy ids
//! - **`registry`** — `NodeRegistry` / `ProcessController` traits and the in-memory `NodeTable`
//! - **`config`** — `convoy.toml` parsing
//! - **`error`** — `CoreError`

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::ConvoyConfig;
pub use error::{CoreError, CoreResult};
pub use registry::{NodeRegistry, NodeTable, ProcessController};
pub use types::*;
