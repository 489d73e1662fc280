use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Organization platform primary key of an employee (not the staff number).
    EmployeeId
);
id_newtype!(CycleId);
id_newtype!(TaskId);
id_newtype!(RuleId);
id_newtype!(IndicatorId);
id_newtype!(PositionId);
id_newtype!(DepartmentId);
id_newtype!(UnitId);

/// Category of an evaluator → evaluatee pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Superior,
    Peer,
    Subordinate,
    #[serde(rename = "self")]
    SelfReview,
    CrossSuperior,
    CrossPeer,
    Manual,
}

impl RelationType {
    pub const ALL: [RelationType; 7] = [
        RelationType::Superior,
        RelationType::Peer,
        RelationType::Subordinate,
        RelationType::SelfReview,
        RelationType::CrossSuperior,
        RelationType::CrossPeer,
        RelationType::Manual,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RelationType::Superior => "superior",
            RelationType::Peer => "peer",
            RelationType::Subordinate => "subordinate",
            RelationType::SelfReview => "self",
            RelationType::CrossSuperior => "cross_superior",
            RelationType::CrossPeer => "cross_peer",
            RelationType::Manual => "manual",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a rule names a relation type outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown relation type '{0}'")]
pub struct UnknownRelationType(pub String);

impl FromStr for RelationType {
    type Err = UnknownRelationType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        RelationType::ALL
            .into_iter()
            .find(|relation| relation.label() == normalized)
            .ok_or_else(|| UnknownRelationType(value.to_string()))
    }
}

/// Population from which automatic peer candidates are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationScope {
    #[default]
    Department,
    Unit,
    Company,
    /// No automatic peer candidates; peers only come from manual assignments.
    Manual,
}

/// Employee as seen by one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub employee_number: String,
    pub name: String,
    pub department_id: DepartmentId,
    pub unit_id: Option<UnitId>,
    pub supervisor_id: Option<EmployeeId>,
    pub position_id: Option<PositionId>,
    /// Higher is more senior.
    pub position_level: i32,
    pub active: bool,
}

impl Employee {
    pub fn level_gap(&self, other: &Employee) -> u32 {
        self.position_level.abs_diff(other.position_level)
    }

    pub fn reports_to(&self, other: &Employee) -> bool {
        self.supervisor_id == Some(other.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Cancelled,
}

/// A bounded evaluation period owning its own task and result sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCycle {
    pub id: CycleId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
    /// Cycles without a rule fall back to supervisor-evaluates-report generation.
    pub rule_id: Option<RuleId>,
}

/// Explicit evaluator → evaluatee override for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAssignment {
    pub cycle_id: CycleId,
    pub evaluator_id: EmployeeId,
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
    pub weight: f64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl TaskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Uniqueness key of a task inside its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub evaluator_id: EmployeeId,
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTask {
    pub id: TaskId,
    pub cycle_id: CycleId,
    pub evaluator_id: EmployeeId,
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
    /// Relation weight copied from the rule or manual assignment at creation time.
    pub weight: f64,
    pub evaluation_code: String,
    pub status: TaskStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvaluationTask {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            evaluator_id: self.evaluator_id,
            evaluatee_id: self.evaluatee_id,
            relation_type: self.relation_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Performance,
    Ability,
    Attitude,
    Teamwork,
    Innovation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub name: String,
    pub category: IndicatorCategory,
    pub weight: f64,
    pub max_score: u8,
    pub active: bool,
}

/// One indicator score recorded against a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub task_id: TaskId,
    pub indicator_id: IndicatorId,
    pub score: u8,
    /// Raw score multiplied by the evaluator's position multiplier at submission time.
    pub weighted_score: Option<f64>,
    #[serde(default)]
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

impl EvaluationScore {
    pub fn effective_score(&self) -> f64 {
        self.weighted_score.unwrap_or(f64::from(self.score))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionWeight {
    pub position_id: PositionId,
    pub multiplier: f64,
    pub active: bool,
}

/// Aggregated, ranked outcome for one employee in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub cycle_id: CycleId,
    pub employee_id: EmployeeId,
    pub total_score: f64,
    pub weighted_score: f64,
    pub superior_score: Option<f64>,
    pub peer_score: Option<f64>,
    pub subordinate_score: Option<f64>,
    pub rank: u32,
    pub is_final: bool,
    pub calculated_at: DateTime<Utc>,
}

/// Task and result counters for a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub cycle_id: CycleId,
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    pub total_results: usize,
}
