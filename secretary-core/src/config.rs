//! Planner configuration, passed explicitly into the facade and solvers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Wall-clock cap on the exact search.
    pub time_budget_secs: f64,
    /// When false the facade goes straight to the heuristic solver.
    pub use_exact_solver: bool,
    /// How many tasks `propose` suggests.
    pub proposal_count: usize,
    pub objective: ObjectiveWeights,
}

/// Objective weights. Only `priority` is wired into the exact objective; the
/// family and pomodoro terms are accepted for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub priority: f64,
    pub family_deficit: f64,
    pub family_overuse: f64,
    pub family_target: f64,
    pub pomodoro_bonus: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: 10.0,
            use_exact_solver: true,
            proposal_count: 5,
            objective: ObjectiveWeights::default(),
        }
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            priority: 1.0,
            family_deficit: 3.0,
            family_overuse: 2.0,
            family_target: 1.0,
            pomodoro_bonus: 0.5,
        }
    }
}

impl PlannerConfig {
    /// Negative or NaN budgets collapse to zero, which makes the exact search
    /// give up immediately.
    pub fn time_budget(&self) -> Duration {
        if self.time_budget_secs.is_nan() || self.time_budget_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.time_budget_secs).unwrap_or(Duration::MAX)
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_secs = budget.as_secs_f64();
        self
    }

    pub fn with_exact_solver(mut self, enabled: bool) -> Self {
        self.use_exact_solver = enabled;
        self
    }
}
