use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    CycleId, Employee, EmployeeId, EvaluationCycle, EvaluationResult, EvaluationScore,
    EvaluationTask, Indicator, ManualAssignment, PositionWeight, RelationType, RuleId, TaskId,
};
use super::rules::EvaluationRule;

/// Task awaiting persistence; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub evaluator_id: EmployeeId,
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
    pub weight: f64,
    pub evaluation_code: String,
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// The three `replace_*` operations are all-or-nothing: on error the prior rows stay.
pub trait EvaluationStore: Send + Sync {
    fn cycle(&self, id: CycleId) -> Result<Option<EvaluationCycle>, RepositoryError>;
    fn upsert_cycle(&self, cycle: EvaluationCycle) -> Result<(), RepositoryError>;

    fn rule(&self, id: RuleId) -> Result<Option<EvaluationRule>, RepositoryError>;
    fn upsert_rule(&self, rule: EvaluationRule) -> Result<(), RepositoryError>;

    fn manual_assignments(&self, cycle: CycleId) -> Result<Vec<ManualAssignment>, RepositoryError>;
    /// Conflict when the (cycle, evaluator, evaluatee) triple already exists.
    fn insert_manual_assignment(&self, assignment: ManualAssignment) -> Result<(), RepositoryError>;

    fn cache_employees(&self, employees: Vec<Employee>) -> Result<(), RepositoryError>;
    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;

    fn indicators(&self) -> Result<Vec<Indicator>, RepositoryError>;
    fn upsert_indicator(&self, indicator: Indicator) -> Result<(), RepositoryError>;

    fn position_weights(&self) -> Result<Vec<PositionWeight>, RepositoryError>;
    fn upsert_position_weight(&self, weight: PositionWeight) -> Result<(), RepositoryError>;

    fn task(&self, id: TaskId) -> Result<Option<EvaluationTask>, RepositoryError>;
    fn cycle_tasks(&self, cycle: CycleId) -> Result<Vec<EvaluationTask>, RepositoryError>;
    fn tasks_by_code(&self, code: &str) -> Result<Vec<EvaluationTask>, RepositoryError>;
    /// Every code in use by cycles other than `cycle`.
    fn codes_outside_cycle(&self, cycle: CycleId) -> Result<HashSet<String>, RepositoryError>;
    /// Delete every task (and its scores) of `cycle` and insert `drafts` in one transaction.
    fn replace_cycle_tasks(
        &self,
        cycle: CycleId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<EvaluationTask>, RepositoryError>;
    fn update_task(&self, task: EvaluationTask) -> Result<(), RepositoryError>;
    /// Move every pending or in-progress task of `cycle` to overdue in one transaction.
    fn mark_cycle_overdue(&self, cycle: CycleId) -> Result<usize, RepositoryError>;

    fn task_scores(&self, task: TaskId) -> Result<Vec<EvaluationScore>, RepositoryError>;
    fn cycle_scores(&self, cycle: CycleId) -> Result<Vec<EvaluationScore>, RepositoryError>;
    /// Persist the task row and swap its scores in one transaction.
    fn replace_task_scores(
        &self,
        task: EvaluationTask,
        scores: Vec<EvaluationScore>,
    ) -> Result<(), RepositoryError>;

    fn cycle_results(&self, cycle: CycleId) -> Result<Vec<EvaluationResult>, RepositoryError>;
    /// Conflict when the cycle's current results are already final.
    fn replace_cycle_results(
        &self,
        cycle: CycleId,
        results: Vec<EvaluationResult>,
    ) -> Result<(), RepositoryError>;
    fn finalize_cycle_results(&self, cycle: CycleId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
