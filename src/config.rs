use std::{ops::Range, time::Duration};

/// Shape of the simulated work every task performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    /// Number of steps before a task completes.
    pub steps: u32,
    /// Blocking delay after each step. Interruptible.
    pub step_delay: Duration,
    /// Each step sums `1..=n` for an `n` drawn uniformly from this range.
    pub work_bounds: Range<u64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            steps: 15,
            step_delay: Duration::from_secs(5),
            work_bounds: 10_000..20_000,
        }
    }
}
