//! Heuristic solver: greedy, dependency-aware fallback.
//!
//! Ordering:
//! - ready set = tasks whose predecessors are all placed
//! - pick highest `priority × family weight`
//! - ties go to the earlier topological position
//!
//! Placement is back-to-back from the horizon start with no window or
//! deadline checks. It always succeeds on a valid acyclic snapshot.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::config::PlannerConfig;
use crate::error::SolveError;
use crate::graph::DependencyGraph;
use crate::plan::{PlanSolution, Proposal, ProposalResponse, ScheduledChunk};
use crate::task::{validate_snapshot, PomodoroSettings, Task, TaskFamily};

pub const HEURISTIC_SOLVER_NAME: &str = "heuristic";
pub const PROPOSAL_REASONING: &str = "High priority slot proposal";

/// Heap entry: highest weight first, then earliest topological position.
#[derive(Debug, Clone, Copy)]
struct Pick {
    weight: f64,
    rank: usize,
    idx: usize,
}

impl Ord for Pick {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

impl PartialOrd for Pick {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pick {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pick {}

#[derive(Debug, Clone)]
pub struct HeuristicSolver {
    proposal_count: usize,
}

impl Default for HeuristicSolver {
    fn default() -> Self {
        Self::new(&PlannerConfig::default())
    }
}

impl HeuristicSolver {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            proposal_count: config.proposal_count,
        }
    }

    /// Indexes into `tasks` in planning order. O(n log n + E).
    pub fn order(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
    ) -> Result<Vec<usize>, SolveError> {
        validate_snapshot(tasks, families)?;

        // Ids are unique, so graph index == task index.
        let graph = DependencyGraph::from_tasks(tasks);
        let rank = graph.topological_rank()?;
        let pick = |idx: usize| Pick {
            weight: tasks[idx].effective_priority(families),
            rank: rank[idx],
            idx,
        };

        let mut ready = graph.ready_set();
        let mut heap: BinaryHeap<Pick> = ready.ready_indices().map(pick).collect();
        let mut order = Vec::with_capacity(tasks.len());
        while let Some(Pick { idx, .. }) = heap.pop() {
            order.push(idx);
            if let Some(released) = ready.complete_index(idx) {
                heap.extend(released.into_iter().map(pick));
            }
        }
        Ok(order)
    }

    pub fn solve(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<PlanSolution, SolveError> {
        if pomodoro.is_some_and(|p| p.enabled) {
            tracing::debug!("pomodoro settings present; chunks are not split");
        }
        let order = self.order(tasks, families)?;

        let mut cursor = horizon_start;
        let mut scheduled = Vec::with_capacity(order.len());
        for idx in order {
            let task = &tasks[idx];
            let end = Duration::try_minutes(task.duration_min)
                .and_then(|d| cursor.checked_add_signed(d))
                .ok_or_else(|| SolveError::Overflow {
                    task_id: task.id.clone(),
                })?;
            scheduled.push(ScheduledChunk::new(
                task.id.clone(),
                cursor,
                end,
                HEURISTIC_SOLVER_NAME,
            ));
            cursor = end;
        }

        if cursor > horizon_end {
            tracing::debug!(
                overrun_min = (cursor - horizon_end).num_minutes(),
                "heuristic plan runs past the horizon"
            );
        }

        Ok(PlanSolution {
            horizon_start,
            horizon_end,
            objective_value: Some(scheduled.len() as f64),
            scheduled,
            solver: HEURISTIC_SOLVER_NAME.to_string(),
        })
    }

    /// Advisory slots for the top tasks, one hour apart starting at `now`.
    pub fn propose(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        _pomodoro: Option<&PomodoroSettings>,
        now: DateTime<Utc>,
    ) -> Result<ProposalResponse, SolveError> {
        let order = self.order(tasks, families)?;

        let mut proposals = Vec::new();
        for (slot, idx) in order.into_iter().take(self.proposal_count).enumerate() {
            let task = &tasks[idx];
            let overflow = || SolveError::Overflow {
                task_id: task.id.clone(),
            };
            let start = Duration::try_hours(slot as i64)
                .and_then(|d| now.checked_add_signed(d))
                .ok_or_else(overflow)?;
            let end = Duration::try_minutes(task.duration_min)
                .and_then(|d| start.checked_add_signed(d))
                .ok_or_else(overflow)?;
            proposals.push(Proposal {
                task_id: task.id.clone(),
                suggested_start: start,
                suggested_end: end,
                score: task.effective_priority(families),
                reasoning: PROPOSAL_REASONING.to_string(),
            });
        }

        Ok(ProposalResponse { proposals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleError;
    use crate::task::DependencyRef;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn ids(sol: &PlanSolution) -> Vec<&str> {
        sol.task_order()
    }

    fn solve(tasks: &[Task], families: &HashMap<String, TaskFamily>) -> PlanSolution {
        HeuristicSolver::default()
            .solve(tasks, families, None, at(), at() + Duration::hours(8))
            .unwrap()
    }

    #[test]
    fn orders_by_descending_priority() {
        let tasks = vec![
            Task::new("low", "low").with_priority(1),
            Task::new("high", "high").with_priority(10),
            Task::new("mid", "mid").with_priority(5),
        ];
        let sol = solve(&tasks, &HashMap::new());
        assert_eq!(ids(&sol), vec!["high", "mid", "low"]);
    }

    #[test]
    fn dependency_overrides_priority() {
        let tasks = vec![
            Task::new("b", "b")
                .with_priority(9)
                .depends_on(DependencyRef::finish_to_start("a")),
            Task::new("a", "a").with_priority(3),
        ];
        let sol = solve(&tasks, &HashMap::new());
        assert_eq!(ids(&sol), vec!["a", "b"]);
    }

    #[test]
    fn released_successor_competes_with_waiting_tasks() {
        let tasks = vec![
            Task::new("a", "a").with_priority(3),
            Task::new("b", "b")
                .with_priority(10)
                .depends_on(DependencyRef::finish_to_start("a")),
            Task::new("c", "c").with_priority(5),
            Task::new("d", "d").with_priority(2),
        ];
        let sol = solve(&tasks, &HashMap::new());
        assert_eq!(ids(&sol), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn family_weight_scales_priority() {
        let mut families = HashMap::new();
        families.insert("study".to_string(), TaskFamily::new("study", "Study").with_weight(1.4));
        let tasks = vec![
            Task::new("plain", "plain").with_priority(8),
            Task::new("weighted", "weighted").with_priority(6).with_family("study"),
        ];
        let sol = solve(&tasks, &families);
        assert_eq!(ids(&sol), vec!["weighted", "plain"]);
    }

    #[test]
    fn equal_priority_ties_follow_topological_position() {
        let tasks = vec![
            Task::new("x", "x").with_priority(5),
            Task::new("y", "y").with_priority(5),
            Task::new("z", "z").with_priority(5),
        ];
        let sol = solve(&tasks, &HashMap::new());
        assert_eq!(ids(&sol), vec!["x", "y", "z"]);
    }

    #[test]
    fn chunks_are_back_to_back_from_horizon_start() {
        let tasks = vec![
            Task::new("a", "a").with_duration(25).with_priority(7),
            Task::new("b", "b").with_duration(50).with_priority(4),
            Task::new("c", "c").with_duration(10).with_priority(9),
        ];
        let sol = solve(&tasks, &HashMap::new());
        assert_eq!(sol.scheduled[0].start, at());
        for pair in sol.scheduled.windows(2) {
            assert_eq!(pair[1].start, pair[0].end);
        }
        assert_eq!(sol.objective_value, Some(3.0));
        assert_eq!(sol.solver, HEURISTIC_SOLVER_NAME);
    }

    #[test]
    fn ignores_windows_and_overruns_horizon() {
        let long = Task::new("long", "long").with_duration(600).fixed().with_window(
            at() + Duration::hours(2),
            at() + Duration::hours(3),
        );
        let sol = solve(&[long], &HashMap::new());
        assert_eq!(sol.scheduled[0].start, at());
        assert!(sol.scheduled[0].end > sol.horizon_end);
    }

    #[test]
    fn cycle_is_an_error() {
        let tasks = vec![
            Task::new("a", "a").depends_on(DependencyRef::finish_to_start("b")),
            Task::new("b", "b").depends_on(DependencyRef::finish_to_start("a")),
        ];
        let err = HeuristicSolver::default()
            .solve(&tasks, &HashMap::new(), None, at(), at() + Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, SolveError::Cycle(CycleError { .. })));
    }

    #[test]
    fn proposals_take_top_five_one_hour_apart() {
        let tasks: Vec<Task> = (1..=7)
            .map(|p| Task::new(format!("t{p}"), "x").with_priority(p).with_duration(90))
            .collect();
        let resp = HeuristicSolver::default()
            .propose(&tasks, &HashMap::new(), None, at())
            .unwrap();

        assert_eq!(resp.proposals.len(), 5);
        assert_eq!(resp.proposals[0].task_id, "t7");
        assert_eq!(resp.proposals[4].task_id, "t3");
        for (k, p) in resp.proposals.iter().enumerate() {
            assert_eq!(p.suggested_start, at() + Duration::hours(k as i64));
            assert_eq!(p.suggested_end, p.suggested_start + Duration::minutes(90));
            assert_eq!(p.reasoning, PROPOSAL_REASONING);
        }
        assert_eq!(resp.proposals[0].score, 7.0);
    }
}
