//! Error taxonomy for the planning core.

use thiserror::Error;

/// The dependency graph has no topological order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency graph contains cycles (unresolved: {})", .unresolved.join(", "))]
pub struct CycleError {
    /// Ids that never reached in-degree zero.
    pub unresolved: Vec<String>,
}

/// A task record that violates the model invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task id must be non-empty")]
    EmptyId,
    #[error("task {id}: duration must be positive, got {duration_min}")]
    NonPositiveDuration { id: String, duration_min: i64 },
    #[error("task {id}: priority must be in 1..=10, got {priority}")]
    PriorityOutOfRange { id: String, priority: u8 },
    #[error("task {id}: time window {index} must start before it ends")]
    InvertedWindow { id: String, index: usize },
    #[error("task {id}: dependency lag must be >= 0, got {lag_min}")]
    NegativeLag { id: String, lag_min: i64 },
    #[error("task {id}: invalid flexibility: {reason}")]
    InvalidFlexibility { id: String, reason: String },
    #[error("duplicate task id {id}")]
    DuplicateId { id: String },
    #[error("family {key}: weight must be positive, got {weight}")]
    InvalidFamilyWeight { key: String, weight: String },
}

/// A solver could not produce a schedule at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    InvalidTask(#[from] TaskError),
    #[error("minute arithmetic overflowed for task {task_id}")]
    Overflow { task_id: String },
}

/// Surfaced to the caller when no plan can be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("horizon start must be before horizon end")]
    InvalidHorizon,
    #[error("unable to produce proposals: {0}")]
    Proposals(#[source] SolveError),
    #[error("unable to produce plan (exact: {exact}; heuristic: {heuristic})")]
    Unsolvable { exact: String, heuristic: SolveError },
}
