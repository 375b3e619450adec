//! Exact solver: branch-and-bound interval placement on one resource.
//!
//! Every task becomes one mandatory interval of fixed length on the minute
//! domain `[to_minutes_ceil(horizon_start), to_minutes(horizon_end)]`. Intervals
//! never overlap (the person's calendar is a single resource), fixed tasks are
//! held inside their first window, flexible tasks inside any one of their
//! windows, deadlines cap the end, and dependencies bound the successor's
//! start per relationship type + lag.
//!
//! The search sequences intervals left to right and places each at its
//! earliest feasible start. All constraints are lower bounds relative to
//! already-placed intervals plus fixed upper bounds, so left-shifted
//! schedules are dominant and the search is complete within its budget.
//!
//! Objective: `Σ floor(priority × priority_weight × 100)` over placed
//! intervals. All intervals are mandatory, so every complete placement
//! carries the same value and the first one found is optimal.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::PlannerConfig;
use crate::graph::DependencyGraph;
use crate::plan::{PlanSolution, ScheduledChunk};
use crate::task::{validate_snapshot, PomodoroSettings, RelationshipType, Task, TaskFamily};
use crate::time::{from_minutes, to_minutes, to_minutes_ceil};

pub const EXACT_SOLVER_NAME: &str = "cp-search";

/// Typed result of an exact solve; the facade inspects it to decide on fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactOutcome {
    Solved(PlanSolution),
    /// No placement satisfies the hard constraints, or none was found in budget.
    Infeasible { reason: String },
    /// The model could not be built (invalid snapshot, cyclic dependencies).
    Failed { message: String },
}

impl ExactOutcome {
    pub fn solution(&self) -> Option<&PlanSolution> {
        match self {
            ExactOutcome::Solved(s) => Some(s),
            _ => None,
        }
    }
}

/// Seam for the facade's first-choice solver.
pub trait ExactEngine {
    fn solve(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> ExactOutcome;
}

#[derive(Debug, Clone)]
pub struct ExactSolver {
    time_budget: Duration,
    priority_weight: f64,
}

impl Default for ExactSolver {
    fn default() -> Self {
        Self::new(&PlannerConfig::default())
    }
}

impl ExactSolver {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            time_budget: config.time_budget(),
            priority_weight: config.objective.priority,
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    fn objective_term(&self, task: &Task) -> i64 {
        (f64::from(task.priority) * self.priority_weight * 100.0).trunc() as i64
    }
}

impl ExactEngine for ExactSolver {
    fn solve(
        &self,
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        pomodoro: Option<&PomodoroSettings>,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> ExactOutcome {
        if let Err(e) = validate_snapshot(tasks, families) {
            return ExactOutcome::Failed {
                message: e.to_string(),
            };
        }
        if tasks.is_empty() {
            return ExactOutcome::Solved(PlanSolution::empty(
                horizon_start,
                horizon_end,
                EXACT_SOLVER_NAME,
            ));
        }
        if pomodoro.is_some_and(|p| p.enabled) {
            tracing::debug!("pomodoro settings present; intervals are not split");
        }

        let model = match Model::build(tasks, families, horizon_start, horizon_end) {
            Ok(model) => model,
            Err(BuildError::Infeasible(reason)) => return ExactOutcome::Infeasible { reason },
            Err(BuildError::Failed(message)) => return ExactOutcome::Failed { message },
        };

        let started = Instant::now();
        let mut search = Search::new(&model, started.checked_add(self.time_budget));
        let found = search.run(model.horizon_start, model.total_duration());
        tracing::debug!(
            nodes = search.nodes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            found,
            "exact search finished"
        );

        if !found {
            let reason = if search.timed_out {
                format!(
                    "time budget of {:.1}s exhausted",
                    self.time_budget.as_secs_f64()
                )
            } else {
                "no feasible placement".to_string()
            };
            return ExactOutcome::Infeasible { reason };
        }

        let scheduled = search
            .sequence
            .iter()
            .map(|&i| {
                let start = search.starts[i].unwrap_or(model.horizon_start);
                let iv = &model.intervals[i];
                ScheduledChunk::new(
                    tasks[i].id.clone(),
                    from_minutes(start),
                    from_minutes(start + iv.duration),
                    EXACT_SOLVER_NAME,
                )
            })
            .collect();

        let objective: i64 = tasks.iter().map(|t| self.objective_term(t)).sum();

        ExactOutcome::Solved(PlanSolution {
            horizon_start,
            horizon_end,
            scheduled,
            objective_value: Some(objective as f64),
            solver: EXACT_SOLVER_NAME.to_string(),
        })
    }
}

enum BuildError {
    Infeasible(String),
    Failed(String),
}

#[derive(Debug, Clone)]
struct Interval {
    duration: i64,
    /// Inclusive start ranges, ascending and disjoint.
    starts: Vec<(i64, i64)>,
    rank: f64,
}

impl Interval {
    fn latest_start(&self) -> i64 {
        self.starts.last().map(|r| r.1).unwrap_or(i64::MIN)
    }

    fn earliest_fit(&self, lower: i64) -> Option<i64> {
        self.starts
            .iter()
            .find(|r| r.1 >= lower)
            .map(|r| r.0.max(lower))
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    pred: usize,
    relation: RelationshipType,
    lag: i64,
}

struct Model {
    horizon_start: i64,
    horizon_end: i64,
    intervals: Vec<Interval>,
    // Sequencing prerequisites (graph predecessors) and the timing links they carry.
    graph_preds: Vec<Vec<usize>>,
    links: Vec<Vec<Link>>,
    memoizable: bool,
}

impl Model {
    fn build(
        tasks: &[Task],
        families: &HashMap<String, TaskFamily>,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<Self, BuildError> {
        let graph = DependencyGraph::from_tasks(tasks);
        graph
            .topological_indices()
            .map_err(|e| BuildError::Failed(e.to_string()))?;

        // Inward rounding keeps every chunk inside the caller's horizon.
        let hs = to_minutes_ceil(horizon_start);
        let he = to_minutes(horizon_end);

        let mut intervals = Vec::with_capacity(tasks.len());
        for task in tasks {
            let starts = start_ranges(task, hs, he);
            if starts.is_empty() {
                return Err(BuildError::Infeasible(format!(
                    "task {} has no feasible start inside the horizon",
                    task.id
                )));
            }
            intervals.push(Interval {
                duration: task.duration_min,
                starts,
                rank: task.effective_priority(families),
            });
        }

        let mut links = vec![Vec::new(); tasks.len()];
        let mut memoizable = true;
        for (succ, task) in tasks.iter().enumerate() {
            for dep in &task.dependencies {
                let Some(pred) = graph.index_of(&dep.predecessor_id) else {
                    continue;
                };
                if pred == succ {
                    continue;
                }
                memoizable &= dep.lag_min == 0;
                links[succ].push(Link {
                    pred,
                    relation: dep.relationship,
                    lag: dep.lag_min,
                });
            }
        }

        let graph_preds = (0..tasks.len())
            .map(|i| graph.predecessors(i).to_vec())
            .collect();

        Ok(Self {
            horizon_start: hs,
            horizon_end: he,
            intervals,
            graph_preds,
            links,
            memoizable,
        })
    }

    fn total_duration(&self) -> i64 {
        self.intervals
            .iter()
            .fold(0i64, |acc, iv| acc.saturating_add(iv.duration))
    }
}

/// Allowed start ranges for one task; empty when it cannot fit at all.
fn start_ranges(task: &Task, hs: i64, he: i64) -> Vec<(i64, i64)> {
    let d = task.duration_min;
    let lo = hs;
    let mut hi = he.saturating_sub(d);
    if let Some(deadline) = task.deadline {
        hi = hi.min(to_minutes(deadline).saturating_sub(d));
    }

    let windows: Vec<_> = if task.is_fixed() {
        task.time_windows.iter().take(1).collect()
    } else {
        task.time_windows.iter().collect()
    };

    let mut ranges: Vec<(i64, i64)> = if windows.is_empty() {
        vec![(lo, hi)]
    } else {
        windows
            .into_iter()
            .map(|w| {
                (
                    lo.max(to_minutes_ceil(w.start)),
                    hi.min(to_minutes(w.end).saturating_sub(d)),
                )
            })
            .collect()
    };
    ranges.retain(|r| r.0 <= r.1);
    ranges.sort_unstable();

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(last) if r.0 <= last.1.saturating_add(1) => last.1 = last.1.max(r.1),
            _ => merged.push(r),
        }
    }
    merged
}

struct Search<'m> {
    model: &'m Model,
    deadline: Option<Instant>,
    starts: Vec<Option<i64>>,
    sequence: Vec<usize>,
    placed: Vec<u64>,
    // placed-set -> smallest cursor known to fail; only sound when no link
    // carries lag, since then no bound reaches past the cursor.
    failed: HashMap<Vec<u64>, i64>,
    nodes: u64,
    timed_out: bool,
}

impl<'m> Search<'m> {
    fn new(model: &'m Model, deadline: Option<Instant>) -> Self {
        let n = model.intervals.len();
        Self {
            model,
            deadline,
            starts: vec![None; n],
            sequence: Vec::with_capacity(n),
            placed: vec![0; n.div_ceil(64)],
            failed: HashMap::new(),
            nodes: 0,
            timed_out: false,
        }
    }

    fn run(&mut self, cursor: i64, remaining: i64) -> bool {
        let model = self.model;
        let n = model.intervals.len();
        if self.sequence.len() == n {
            return true;
        }
        self.nodes += 1;
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.timed_out = true;
            return false;
        }
        if remaining > model.horizon_end.saturating_sub(cursor) {
            return self.fail(cursor);
        }
        if model.memoizable && self.failed.get(&self.placed).is_some_and(|&c| c <= cursor) {
            return false;
        }

        // (interval, start, latest start)
        let mut candidates: Vec<(usize, i64, i64)> = Vec::new();
        for (i, iv) in model.intervals.iter().enumerate() {
            if self.starts[i].is_some() {
                continue;
            }
            let latest = iv.latest_start();
            if latest < cursor {
                return self.fail(cursor);
            }
            if !model.graph_preds[i].iter().all(|&p| self.starts[p].is_some()) {
                continue;
            }
            let lower = cursor.max(self.link_bound(i));
            match iv.earliest_fit(lower) {
                Some(start) => candidates.push((i, start, latest)),
                // Bounds only grow from here on.
                None => return self.fail(cursor),
            }
        }

        candidates.sort_by(|a, b| {
            a.2.cmp(&b.2)
                .then_with(|| model.intervals[b.0].rank.total_cmp(&model.intervals[a.0].rank))
                .then_with(|| a.0.cmp(&b.0))
        });

        for (i, start, _) in candidates {
            let duration = model.intervals[i].duration;
            self.place(i, start);
            if self.run(start + duration, remaining - duration) {
                return true;
            }
            self.unplace(i);
            if self.timed_out {
                return false;
            }
        }
        self.fail(cursor)
    }

    /// Earliest start of `succ` implied by its placed predecessors.
    fn link_bound(&self, succ: usize) -> i64 {
        let d_succ = self.model.intervals[succ].duration;
        self.model.links[succ]
            .iter()
            .filter_map(|l| {
                let s_pred = self.starts[l.pred]?;
                let e_pred = s_pred.saturating_add(self.model.intervals[l.pred].duration);
                let bound = match l.relation {
                    RelationshipType::FinishToStart => e_pred.saturating_add(l.lag),
                    RelationshipType::StartToStart => s_pred.saturating_add(l.lag),
                    RelationshipType::FinishToFinish => {
                        e_pred.saturating_add(l.lag).saturating_sub(d_succ)
                    }
                    RelationshipType::StartToFinish => {
                        s_pred.saturating_add(l.lag).saturating_sub(d_succ)
                    }
                };
                Some(bound)
            })
            .max()
            .unwrap_or(i64::MIN)
    }

    fn place(&mut self, i: usize, start: i64) {
        self.starts[i] = Some(start);
        self.sequence.push(i);
        self.placed[i / 64] |= 1u64 << (i % 64);
    }

    fn unplace(&mut self, i: usize) {
        self.starts[i] = None;
        self.sequence.pop();
        self.placed[i / 64] &= !(1u64 << (i % 64));
    }

    fn fail(&mut self, cursor: i64) -> bool {
        if self.model.memoizable && !self.timed_out {
            self.failed
                .entry(self.placed.clone())
                .and_modify(|c| *c = (*c).min(cursor))
                .or_insert(cursor);
        }
        false
    }
}
