// SPDX-License-Identifier: PMPL-1.0-or-later
//! Wall-clock budget for one audit.
//!
//! The deadline is a plain value passed down to the evaluators and polled
//! between rules. It is cooperative: a single slow rule can still overrun.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start the clock now
    pub fn start(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    /// A deadline that never expires in practice
    pub fn unlimited() -> Self {
        Self::start(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// True once the elapsed time has reached the budget
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired() {
        assert!(Deadline::start(Duration::ZERO).expired());
    }

    #[test]
    fn test_unlimited_not_expired() {
        let deadline = Deadline::unlimited();
        assert!(!deadline.expired());
        assert_eq!(deadline.budget(), Duration::MAX);
    }
}
