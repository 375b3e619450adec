//! Planning facade: exact solver first, heuristic fallback.
//!
//! Both solvers' outputs come back as one `PlanSolution` shape. A degraded
//! plan is still a success; its `solver` field reads `heuristic:<reason>`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::PlannerConfig;
use crate::error::PlanningError;
use crate::exact::{ExactEngine, ExactOutcome, ExactSolver};
use crate::heuristic::{HeuristicSolver, HEURISTIC_SOLVER_NAME};
use crate::plan::{PlanSolution, ProposalResponse};
use crate::task::{PlanningContext, PomodoroSettings, Task, TaskFamily};

#[derive(Debug, Clone)]
pub struct Planner<E: ExactEngine = ExactSolver> {
    config: PlannerConfig,
    exact: E,
    heuristic: HeuristicSolver,
}

impl Planner<ExactSolver> {
    pub fn new(config: PlannerConfig) -> Self {
        let exact = ExactSolver::new(&config);
        Self::with_exact(config, exact)
    }
}

impl Default for Planner<ExactSolver> {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl<E: ExactEngine> Planner<E> {
    pub fn with_exact(config: PlannerConfig, exact: E) -> Self {
        let heuristic = HeuristicSolver::new(&config);
        Self {
            config,
            exact,
            heuristic,
        }
    }

    pub fn solve(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<PlanSolution, PlanningError> {
        if horizon_start >= horizon_end {
            return Err(PlanningError::InvalidHorizon);
        }

        let reason = if self.config.use_exact_solver {
            match self
                .exact
                .solve(tasks, families, pomodoro, horizon_start, horizon_end)
            {
                ExactOutcome::Solved(solution) => {
                    tracing::info!(
                        solver = %solution.solver,
                        chunks = solution.scheduled.len(),
                        "plan produced"
                    );
                    return Ok(solution);
                }
                ExactOutcome::Infeasible { reason } => reason,
                ExactOutcome::Failed { message } => message,
            }
        } else {
            "exact solver disabled".to_string()
        };

        tracing::warn!(%reason, "exact solver declined; falling back to heuristic");
        let mut solution = self
            .heuristic
            .solve(tasks, families, pomodoro, horizon_start, horizon_end)
            .map_err(|heuristic| PlanningError::Unsolvable {
                exact: reason.clone(),
                heuristic,
            })?;
        solution.solver = format!("{HEURISTIC_SOLVER_NAME}:{reason}");
        tracing::info!(
            solver = %solution.solver,
            chunks = solution.scheduled.len(),
            "plan produced"
        );
        Ok(solution)
    }

    /// Heuristic advisory mode anchored at the current time.
    pub fn propose(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
    ) -> Result<ProposalResponse, PlanningError> {
        self.propose_at(tasks, families, pomodoro, Utc::now())
    }

    pub fn propose_at(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
        now: DateTime<Utc>,
    ) -> Result<ProposalResponse, PlanningError> {
        self.heuristic
            .propose(tasks, families, pomodoro, now)
            .map_err(PlanningError::Proposals)
    }

    pub fn solve_context(
        &self,
        ctx: &PlanningContext,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<PlanSolution, PlanningError> {
        self.solve(
            &ctx.tasks,
            &ctx.families,
            ctx.pomodoro.as_ref(),
            horizon_start,
            horizon_end,
        )
    }

    pub fn propose_context(&self, ctx: &PlanningContext) -> Result<ProposalResponse, PlanningError> {
        self.propose(&ctx.tasks, &ctx.families, ctx.pomodoro.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolveError;
    use crate::exact::EXACT_SOLVER_NAME;
    use crate::task::DependencyRef;
    use chrono::{Duration, TimeZone};

    #[derive(Debug, Clone)]
    struct BrokenExact;
    impl ExactEngine for BrokenExact {
        fn solve(
            &self,
            _tasks: &[Task],
            _families: &HashMap<String, TaskFamily>,
            _pomodoro: Option<&PomodoroSettings>,
            _horizon_start: DateTime<Utc>,
            _horizon_end: DateTime<Utc>,
        ) -> ExactOutcome {
            ExactOutcome::Failed {
                message: "solver backend crashed".to_string(),
            }
        }
    }

    fn horizon() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        (start, start + Duration::hours(8))
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("a", "a").with_duration(60).with_priority(4),
            Task::new("b", "b").with_duration(30).with_priority(8),
        ]
    }

    #[test]
    fn exact_solution_is_returned_untouched() {
        let (start, end) = horizon();
        let sol = Planner::new(PlannerConfig::default())
            .solve(&tasks(), &HashMap::new(), None, start, end)
            .unwrap();
        assert_eq!(sol.solver, EXACT_SOLVER_NAME);
        assert_eq!(sol.scheduled.len(), 2);
    }

    #[test]
    fn failing_exact_falls_back_with_reason() {
        let (start, end) = horizon();
        let planner = Planner::with_exact(PlannerConfig::default(), BrokenExact);
        let sol = planner.solve(&tasks(), &HashMap::new(), None, start, end).unwrap();
        assert_eq!(sol.solver, "heuristic:solver backend crashed");
        assert_eq!(sol.scheduled.len(), 2);
        assert_eq!(sol.task_order(), vec!["b", "a"]);
    }

    #[test]
    fn disabled_exact_goes_straight_to_heuristic() {
        let (start, end) = horizon();
        let planner = Planner::new(PlannerConfig::default().with_exact_solver(false));
        let sol = planner.solve(&tasks(), &HashMap::new(), None, start, end).unwrap();
        assert_eq!(sol.solver, "heuristic:exact solver disabled");
    }

    #[test]
    fn inverted_horizon_is_rejected() {
        let (start, end) = horizon();
        let err = Planner::new(PlannerConfig::default())
            .solve(&tasks(), &HashMap::new(), None, end, start)
            .unwrap_err();
        assert_eq!(err, PlanningError::InvalidHorizon);
    }

    #[test]
    fn malformed_input_fails_both_solvers() {
        let (start, end) = horizon();
        let bad = vec![Task::new("a", "a").with_duration(-10)];
        let err = Planner::new(PlannerConfig::default())
            .solve(&bad, &HashMap::new(), None, start, end)
            .unwrap_err();
        match err {
            PlanningError::Unsolvable { heuristic, .. } => {
                assert!(matches!(heuristic, SolveError::InvalidTask(_)))
            }
            other => panic!("expected unsolvable, got {other:?}"),
        }
    }

    #[test]
    fn cycle_surfaces_as_planning_error() {
        let (start, end) = horizon();
        let cyclic = vec![
            Task::new("a", "a").depends_on(DependencyRef::finish_to_start("b")),
            Task::new("b", "b").depends_on(DependencyRef::finish_to_start("a")),
        ];
        let err = Planner::new(PlannerConfig::default())
            .solve(&cyclic, &HashMap::new(), None, start, end)
            .unwrap_err();
        assert!(matches!(
            err,
            PlanningError::Unsolvable {
                heuristic: SolveError::Cycle(_),
                ..
            }
        ));
    }

    #[test]
    fn propose_delegates_to_heuristic() {
        let (start, _) = horizon();
        let resp = Planner::new(PlannerConfig::default())
            .propose_at(&tasks(), &HashMap::new(), None, start)
            .unwrap();
        assert_eq!(resp.proposals.len(), 2);
        assert_eq!(resp.proposals[0].task_id, "b");
        assert_eq!(resp.proposals[1].suggested_start, start + Duration::hours(1));
    }
}
