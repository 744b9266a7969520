//! Bounded sample windows per subject.
//!
//! Each node or process keeps its last `depth` samples; older ones are
//! evicted first. Windows are created on the first sample.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::stats::{RegressionBackend, SampleStats, get_stats_with};

pub struct SampleHistory {
    depth: usize,
    backend: RegressionBackend,
    windows: HashMap<String, VecDeque<f64>>,
}

impl SampleHistory {
    /// Create a history keeping `depth` samples per subject, using the
    /// regression backend detected for this build.
    pub fn new(depth: usize) -> Self {
        Self::with_backend(depth, RegressionBackend::detect())
    }

    pub fn with_backend(depth: usize, backend: RegressionBackend) -> Self {
        debug!(depth, ?backend, "sample history created");
        Self {
            depth: depth.max(1),
            backend,
            windows: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn backend(&self) -> RegressionBackend {
        self.backend
    }

    /// Append a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, subject: &str, value: f64) {
        let window = self
            .windows
            .entry(subject.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.depth));
        if window.len() == self.depth {
            window.pop_front();
        }
        window.push_back(value);
    }

    /// Samples of a subject, oldest first.
    pub fn samples(&self, subject: &str) -> Option<Vec<f64>> {
        self.windows
            .get(subject)
            .map(|w| w.iter().copied().collect())
    }

    /// Trend signals of a subject's current window.
    pub fn stats(&self, subject: &str) -> Option<SampleStats> {
        let samples = self.samples(subject)?;
        get_stats_with(self.backend, &samples)
    }

    /// Drop a subject, e.g. when a node leaves the fleet.
    pub fn remove(&mut self, subject: &str) -> bool {
        self.windows.remove(subject).is_some()
    }

    /// Tracked subjects, sorted.
    pub fn subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = self.windows.keys().map(String::as_str).collect();
        subjects.sort_unstable();
        subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_bounded() {
        let mut history = SampleHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.push("n1", v);
        }
        assert_eq!(history.samples("n1"), Some(vec![3.0, 4.0, 5.0]));
    }

    #[test]
    fn stats_follow_the_window() {
        let mut history = SampleHistory::new(2);
        history.push("n1", 10.0);
        let stats = history.stats("n1").unwrap();
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.rate, None);

        history.push("n1", 20.0);
        let stats = history.stats("n1").unwrap();
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.rate, Some(100.0));
        assert_eq!(stats.stddev, Some(5.0));

        history.push("n1", 10.0);
        let stats = history.stats("n1").unwrap();
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.rate, Some(-50.0));
    }

    #[test]
    fn subjects_are_independent() {
        let mut history = SampleHistory::with_backend(4, RegressionBackend::NormalEquations);
        history.push("b", 1.0);
        history.push("a", 2.0);
        history.push("b", 3.0);

        assert_eq!(history.subjects(), ["a", "b"]);
        assert_eq!(history.samples("a"), Some(vec![2.0]));
        assert_eq!(history.samples("b"), Some(vec![1.0, 3.0]));
        assert_eq!(history.stats("missing"), None);

        assert!(history.remove("a"));
        assert!(!history.remove("a"));
        assert_eq!(history.subjects(), ["b"]);
    }
}
