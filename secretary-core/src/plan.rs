//! Planning output contracts.
//!
//! Created fresh on every planning call and never persisted by the core.
//! serde-ready so the request layer can hand them out as JSON unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata key naming the solver that produced a chunk.
pub const SOLVER_KEY: &str = "solver";

/// One contiguous scheduled occurrence of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledChunk {
    pub task_id: String,
    pub chunk_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ScheduledChunk {
    /// New chunk with a fresh v4 chunk id, tagged with the producing solver.
    pub fn new(
        task_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        solver: &str,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SOLVER_KEY.to_string(), solver.to_string());
        Self {
            task_id: task_id.into(),
            chunk_id: Uuid::new_v4().to_string(),
            start,
            end,
            is_break: false,
            metadata,
        }
    }

    pub fn duration_min(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open `[start, end)` intersection.
    pub fn overlaps(&self, other: &ScheduledChunk) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSolution {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub scheduled: Vec<ScheduledChunk>,
    pub objective_value: Option<f64>,
    /// Producing solver; `heuristic:<reason>` when the facade fell back.
    pub solver: String,
}

impl PlanSolution {
    pub fn empty(horizon_start: DateTime<Utc>, horizon_end: DateTime<Utc>, solver: &str) -> Self {
        Self {
            horizon_start,
            horizon_end,
            scheduled: Vec::new(),
            objective_value: Some(0.0),
            solver: solver.to_string(),
        }
    }

    /// Task ids in schedule order.
    pub fn task_order(&self) -> Vec<&str> {
        self.scheduled.iter().map(|c| c.task_id.as_str()).collect()
    }

    pub fn is_fallback(&self) -> bool {
        self.solver.starts_with("heuristic")
    }

    /// Pairs of chunk indexes whose intervals intersect.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for i in 0..self.scheduled.len() {
            for j in (i + 1)..self.scheduled.len() {
                if self.scheduled[i].overlaps(&self.scheduled[j]) {
                    out.push((i, j));
                }
            }
        }
        out
    }
}

/// Advisory slot suggestion; not a committed schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub task_id: String,
    pub suggested_start: DateTime<Utc>,
    pub suggested_end: DateTime<Utc>,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub proposals: Vec<Proposal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn chunks_get_distinct_ids_and_solver_tag() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let a = ScheduledChunk::new("t1", at, at + Duration::minutes(30), "heuristic");
        let b = ScheduledChunk::new("t1", at, at + Duration::minutes(30), "heuristic");
        assert_ne!(a.chunk_id, b.chunk_id);
        assert_eq!(a.metadata.get(SOLVER_KEY).map(String::as_str), Some("heuristic"));
        assert_eq!(a.duration_min(), 30);
    }

    #[test]
    fn touching_chunks_do_not_overlap() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let a = ScheduledChunk::new("a", at, at + Duration::minutes(30), "x");
        let b = ScheduledChunk::new("b", at + Duration::minutes(30), at + Duration::minutes(60), "x");
        let c = ScheduledChunk::new("c", at + Duration::minutes(29), at + Duration::minutes(40), "x");
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn plan_solution_json_uses_snake_case_keys() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut sol = PlanSolution::empty(at, at + Duration::hours(8), "heuristic:budget exhausted");
        sol.scheduled
            .push(ScheduledChunk::new("t1", at, at + Duration::minutes(15), "heuristic"));

        let json = serde_json::to_string(&sol).unwrap();
        assert!(json.contains("\"horizon_start\":"));
        assert!(json.contains("\"objective_value\":0.0"));
        assert!(json.contains("\"solver\":\"heuristic:budget exhausted\""));
        assert!(json.contains("\"is_break\":false"));

        let back: PlanSolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sol);
        assert!(back.is_fallback());
    }
}
