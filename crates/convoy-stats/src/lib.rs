//! convoy-stats — trend signals over periodic load samples.
//!
//! Turns a window of numeric samples (node loading, process CPU, ...)
//! into a mean, the instant rate between the last two samples, a
//! linear-regression trend and the population standard deviation.
//!
//! # Architecture
//!
//! ```text
//! SampleHistory (bounded window per node / process)
//!   └── stats(subject) → get_stats(samples)
//!         ├── mean()
//!         ├── instant_rate()
//!         ├── linear_regression() ← RegressionBackend::detect()
//!         └── population_stddev()
//! ```

pub mod history;
pub mod stats;

pub use history::SampleHistory;
pub use stats::{
    Regression, RegressionBackend, SampleStats, get_stats, get_stats_with, instant_rate,
    linear_regression, mean, population_stddev,
};
