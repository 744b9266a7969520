//! Convoy deployment engine — picks the node hosting a new process instance.
//!
//! This crate only decides. Starting the process on the chosen node is
//! the caller's job, and a `None` answer means no node is eligible right
//! now; the control loop retries on a later tick.
//!
//! # Components
//!
//! - **`evaluator`** — Per-node load validity against the 100% ceiling
//! - **`strategy`** — CONFIG / LESS_LOADED / MOST_LOADED and the `select_node` dispatcher

pub mod evaluator;
pub mod strategy;

pub use evaluator::{LoadingMap, NodeLoadEvaluator, sort_valid_by_loading};
pub use strategy::{config_node, less_loaded_node, most_loaded_node, select_node};
