//! Task model consumed by the planning engine.
//!
//! Records arrive already deserialized from the task store; the planner only
//! reads them. Every optional attribute is an explicit `Option`/`Vec` so the
//! solvers never have to guess which fields a record carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Anchored to an explicit time window.
    Fixed,
    /// May be placed anywhere feasible in the horizon.
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// Precedence reference; the owning task is the successor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub predecessor_id: String,
    #[serde(default)]
    pub relationship: RelationshipType,
    /// Minutes, >= 0.
    #[serde(default)]
    pub lag_min: i64,
}

impl DependencyRef {
    pub fn finish_to_start(predecessor_id: impl Into<String>) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            relationship: RelationshipType::FinishToStart,
            lag_min: 0,
        }
    }

    pub fn with_relationship(mut self, relationship: RelationshipType) -> Self {
        self.relationship = relationship;
        self
    }

    pub fn with_lag(mut self, lag_min: i64) -> Self {
        self.lag_min = lag_min;
        self
    }
}

/// Absolute `[start, end)` availability interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Shift and splitting bounds. Carried through; neither solver splits tasks yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flexibility {
    #[serde(default)]
    pub earliest_shift_min: Option<i64>,
    #[serde(default)]
    pub latest_shift_min: Option<i64>,
    #[serde(default)]
    pub can_split: bool,
    #[serde(default)]
    pub min_chunk_min: Option<i64>,
    #[serde(default)]
    pub max_splits: Option<u32>,
}

/// Core task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,

    pub kind: TaskKind,

    /// Minutes.
    pub duration_min: i64,

    /// 1-10, higher means more important.
    pub priority: u8,

    /// Optional hard deadline (UTC).
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub time_windows: Vec<TimeWindow>,

    #[serde(default)]
    pub flexibility: Option<Flexibility>,

    #[serde(default)]
    pub family_key: Option<String>,

    #[serde(default)]
    pub pomodoro_opt_in: bool,

    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: TaskKind::Flexible,
            duration_min: 30,
            priority: 5,
            deadline: None,
            time_windows: Vec::new(),
            flexibility: None,
            family_key: None,
            pomodoro_opt_in: false,
            dependencies: Vec::new(),
        }
    }

    pub fn fixed(mut self) -> Self {
        self.kind = TaskKind::Fixed;
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_min = minutes;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_windows.push(TimeWindow::new(start, end));
        self
    }

    pub fn with_flexibility(mut self, flexibility: Flexibility) -> Self {
        self.flexibility = Some(flexibility);
        self
    }

    pub fn with_family(mut self, key: impl Into<String>) -> Self {
        self.family_key = Some(key.into());
        self
    }

    pub fn with_pomodoro(mut self, opt_in: bool) -> Self {
        self.pomodoro_opt_in = opt_in;
        self
    }

    pub fn depends_on(mut self, dep: DependencyRef) -> Self {
        self.dependencies.push(dep);
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.kind == TaskKind::Fixed
    }

    /// `priority × family weight`; weight is 1.0 for no family or an unknown key.
    pub fn effective_priority(&self, families: &HashMap<String, TaskFamily>) -> f64 {
        let weight = self
            .family_key
            .as_deref()
            .and_then(|k| families.get(k))
            .map(|f| f.weight)
            .unwrap_or(1.0);
        f64::from(self.priority) * weight
    }

    /// Model invariants. Dangling and self dependencies are not errors here;
    /// the resolver drops them.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.id.trim().is_empty() {
            return Err(TaskError::EmptyId);
        }
        if self.duration_min <= 0 {
            return Err(TaskError::NonPositiveDuration {
                id: self.id.clone(),
                duration_min: self.duration_min,
            });
        }
        if !(1..=10).contains(&self.priority) {
            return Err(TaskError::PriorityOutOfRange {
                id: self.id.clone(),
                priority: self.priority,
            });
        }
        for (index, w) in self.time_windows.iter().enumerate() {
            if w.start >= w.end {
                return Err(TaskError::InvertedWindow {
                    id: self.id.clone(),
                    index,
                });
            }
        }
        for dep in &self.dependencies {
            if dep.lag_min < 0 {
                return Err(TaskError::NegativeLag {
                    id: self.id.clone(),
                    lag_min: dep.lag_min,
                });
            }
        }
        if let Some(flex) = &self.flexibility {
            flex.validate()
                .map_err(|reason| TaskError::InvalidFlexibility {
                    id: self.id.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}

impl Flexibility {
    fn validate(&self) -> Result<(), String> {
        if let (Some(lo), Some(hi)) = (self.earliest_shift_min, self.latest_shift_min) {
            if lo > hi {
                return Err("earliest_shift_min must not exceed latest_shift_min".to_string());
            }
        }
        if self.min_chunk_min.is_some_and(|m| m <= 0) {
            return Err("min_chunk_min must be positive".to_string());
        }
        if self.max_splits == Some(0) {
            return Err("max_splits must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Validates every task and family of one planning call, plus id uniqueness.
pub fn validate_snapshot(
    tasks: &[Task],
    families: &HashMap<String, TaskFamily>,
) -> Result<(), TaskError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()?;
        if !seen.insert(task.id.as_str()) {
            return Err(TaskError::DuplicateId { id: task.id.clone() });
        }
    }
    for family in families.values() {
        family.validate()?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPeriod {
    #[default]
    Daily,
    Weekly,
}

/// Group of tasks sharing a priority multiplier and minute budgets.
///
/// Only `weight` influences planning; the budgets are declared targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFamily {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub min_minutes: Option<i64>,
    #[serde(default)]
    pub target_minutes: Option<i64>,
    #[serde(default)]
    pub max_minutes: Option<i64>,
    #[serde(default)]
    pub period: QuotaPeriod,
}

fn default_weight() -> f64 {
    1.0
}

impl TaskFamily {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            weight: 1.0,
            min_minutes: None,
            target_minutes: None,
            max_minutes: None,
            period: QuotaPeriod::Daily,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_budget(mut self, min: Option<i64>, target: Option<i64>, max: Option<i64>) -> Self {
        self.min_minutes = min;
        self.target_minutes = target;
        self.max_minutes = max;
        self
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(TaskError::InvalidFamilyWeight {
                key: self.key.clone(),
                weight: self.weight.to_string(),
            });
        }
        Ok(())
    }
}

/// Per-user pomodoro preferences. Accepted by both solvers, not yet acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub enabled: bool,
    pub pomodoro_min: i64,
    pub short_break_min: i64,
    pub long_break_min: i64,
    pub long_break_every: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pomodoro_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            long_break_every: 4,
        }
    }
}

/// One user's materialized task snapshot for a single planning call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub families: HashMap<String, TaskFamily>,
    #[serde(default)]
    pub pomodoro: Option<PomodoroSettings>,
}
