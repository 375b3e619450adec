//! secretary-core: planning engine for the personal task scheduler.
//!
//! Given one user's task snapshot and a horizon, computes a non-overlapping
//! placement of tasks on the calendar. An exact branch-and-bound solver runs
//! first; a greedy dependency-aware heuristic takes over when it declines.

pub mod config;
pub mod error;
pub mod exact;
pub mod graph;
pub mod heuristic;
pub mod plan;
pub mod planner;
pub mod task;
pub mod time;

pub use config::{ObjectiveWeights, PlannerConfig};
pub use error::{CycleError, PlanningError, SolveError, TaskError};
pub use exact::{ExactEngine, ExactOutcome, ExactSolver, EXACT_SOLVER_NAME};
pub use graph::{topological_sort, DependencyGraph, ReadySet};
pub use heuristic::{HeuristicSolver, HEURISTIC_SOLVER_NAME, PROPOSAL_REASONING};
pub use plan::{PlanSolution, Proposal, ProposalResponse, ScheduledChunk};
pub use planner::Planner;
pub use task::{
    validate_snapshot, DependencyRef, Flexibility, PlanningContext, PomodoroSettings, QuotaPeriod,
    RelationshipType, Task, TaskFamily, TaskKind, TimeWindow,
};
pub use time::{from_minutes, parse_local_to_utc, to_minutes, to_minutes_ceil};
