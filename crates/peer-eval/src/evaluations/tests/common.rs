use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::evaluations::domain::{
    CycleId, CycleStatus, DepartmentId, Employee, EmployeeId, EvaluationCycle, EvaluationResult,
    EvaluationScope, EvaluationScore, EvaluationTask, Indicator, IndicatorCategory, IndicatorId,
    ManualAssignment, PositionId, PositionWeight, RelationType, RuleId, TaskId, TaskStatus,
};
use crate::evaluations::memory::InMemoryEvaluationStore;
use crate::evaluations::org::{OrgFetchError, OrgSnapshot, OrgSnapshotProvider, StaticOrgProvider};
use crate::evaluations::repository::{EvaluationStore, RepositoryError, TaskDraft};
use crate::evaluations::rules::{EvaluationRule, SuperiorStrategy};
use crate::evaluations::service::EvaluationService;

pub(super) const ENGINEERING: DepartmentId = DepartmentId(1);
pub(super) const SALES: DepartmentId = DepartmentId(2);

pub(super) fn employee(
    id: u64,
    department: DepartmentId,
    supervisor: Option<u64>,
    level: i32,
) -> Employee {
    Employee {
        id: EmployeeId(id),
        employee_number: format!("E{id:03}"),
        name: format!("Employee {id}"),
        department_id: department,
        unit_id: None,
        supervisor_id: supervisor.map(EmployeeId),
        position_id: Some(PositionId(level as u64)),
        position_level: level,
        active: true,
    }
}

/// Director (12) → managers (9) → staff (4) across two departments; #7 has left.
pub(super) fn org_chart() -> Vec<Employee> {
    let mut departed = employee(7, ENGINEERING, Some(2), 4);
    departed.active = false;
    vec![
        employee(1, ENGINEERING, None, 12),
        employee(2, ENGINEERING, Some(1), 9),
        employee(3, ENGINEERING, Some(1), 9),
        employee(4, ENGINEERING, Some(2), 4),
        employee(5, ENGINEERING, Some(2), 4),
        employee(6, ENGINEERING, Some(3), 4),
        departed,
        employee(8, SALES, Some(1), 9),
        employee(9, SALES, Some(8), 4),
    ]
}

pub(super) fn snapshot() -> OrgSnapshot {
    OrgSnapshot::from_employees(org_chart())
}

pub(super) fn rule(relations: &[RelationType], weights: &[(RelationType, f64)]) -> EvaluationRule {
    EvaluationRule {
        id: RuleId(1),
        name: "test rule".to_string(),
        relation_types: relations.to_vec(),
        evaluation_scope: EvaluationScope::Department,
        max_evaluators_per_relation: 3,
        min_evaluators_per_relation: 1,
        relation_weights: weights.iter().copied().collect::<BTreeMap<_, _>>(),
        allow_cross_department: false,
        allow_cross_unit: false,
        allow_self_evaluation: false,
        position_level_diff_limit: 5,
        superior_strategy: SuperiorStrategy::default(),
    }
}

pub(super) fn rule_360() -> EvaluationRule {
    let mut rule = rule(
        &[
            RelationType::Superior,
            RelationType::Peer,
            RelationType::Subordinate,
            RelationType::SelfReview,
        ],
        &[
            (RelationType::Superior, 0.5),
            (RelationType::Peer, 0.3),
            (RelationType::Subordinate, 0.1),
            (RelationType::SelfReview, 0.1),
        ],
    );
    rule.allow_self_evaluation = true;
    rule.superior_strategy = SuperiorStrategy::ReportingLine;
    rule
}

pub(super) fn cycle(id: u64, rule_id: Option<RuleId>) -> EvaluationCycle {
    EvaluationCycle {
        id: CycleId(id),
        name: format!("2025 H{id}"),
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
        status: CycleStatus::Active,
        rule_id,
    }
}

pub(super) fn indicator(id: u64, weight: f64) -> Indicator {
    Indicator {
        id: IndicatorId(id),
        name: format!("Indicator {id}"),
        category: IndicatorCategory::Performance,
        weight,
        max_score: 100,
        active: true,
    }
}

pub(super) fn manual(evaluator: u64, evaluatee: u64, relation: RelationType, weight: f64) -> ManualAssignment {
    ManualAssignment {
        cycle_id: CycleId(1),
        evaluator_id: EmployeeId(evaluator),
        evaluatee_id: EmployeeId(evaluatee),
        relation_type: relation,
        weight,
        reason: "cross-team project".to_string(),
    }
}

pub(super) fn completed_task(
    id: u64,
    evaluatee: u64,
    relation: RelationType,
    weight: f64,
) -> EvaluationTask {
    EvaluationTask {
        id: TaskId(id),
        cycle_id: CycleId(1),
        evaluator_id: EmployeeId(100 + id),
        evaluatee_id: EmployeeId(evaluatee),
        relation_type: relation,
        weight,
        evaluation_code: format!("CODE{id:012}"),
        status: TaskStatus::Completed,
        assigned_at: Utc::now(),
        completed_at: Some(Utc::now()),
    }
}

pub(super) fn raw_score(task: u64, indicator: u64, score: u8) -> EvaluationScore {
    EvaluationScore {
        task_id: TaskId(task),
        indicator_id: IndicatorId(indicator),
        score,
        weighted_score: None,
        comment: String::new(),
        submitted_at: Utc::now(),
    }
}

pub(super) type MemoryService = EvaluationService<InMemoryEvaluationStore, StaticOrgProvider>;

/// Service over the sample org with the 360 rule (cycle 1) and a rule-less cycle (cycle 2).
pub(super) fn build_service() -> (MemoryService, Arc<InMemoryEvaluationStore>) {
    let store = Arc::new(InMemoryEvaluationStore::new());
    seed(store.as_ref());
    let service = EvaluationService::new(
        store.clone(),
        Arc::new(StaticOrgProvider::new(org_chart())),
    );
    (service, store)
}

pub(super) fn seed<S: EvaluationStore>(store: &S) {
    store.upsert_rule(rule_360()).expect("rule stored");
    store
        .upsert_cycle(cycle(1, Some(RuleId(1))))
        .expect("cycle stored");
    store.upsert_cycle(cycle(2, None)).expect("cycle stored");
    store.upsert_indicator(indicator(1, 0.6)).expect("indicator");
    store.upsert_indicator(indicator(2, 0.4)).expect("indicator");
    store
        .upsert_position_weight(PositionWeight {
            position_id: PositionId(12),
            multiplier: 1.5,
            active: true,
        })
        .expect("position weight");
}

pub(super) fn triples(tasks: &[EvaluationTask]) -> Vec<(EmployeeId, EmployeeId, RelationType)> {
    let mut triples: Vec<_> = tasks
        .iter()
        .map(|task| (task.evaluator_id, task.evaluatee_id, task.relation_type))
        .collect();
    triples.sort();
    triples
}

/// Provider that never answers within the service timeout.
pub(super) struct SlowOrgProvider;

#[async_trait]
impl OrgSnapshotProvider for SlowOrgProvider {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(org_chart())
    }
}

pub(super) struct FailingOrgProvider;

#[async_trait]
impl OrgSnapshotProvider for FailingOrgProvider {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError> {
        Err(OrgFetchError::Status(503))
    }
}

/// Delegating store whose task replacement or entire surface can be switched off.
#[derive(Default)]
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryEvaluationStore,
    pub(super) reject_task_replace: AtomicBool,
    pub(super) offline: AtomicBool,
}

impl FlakyStore {
    fn gate(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EvaluationStore for FlakyStore {
    fn cycle(&self, id: CycleId) -> Result<Option<EvaluationCycle>, RepositoryError> {
        self.gate()?;
        self.inner.cycle(id)
    }

    fn upsert_cycle(&self, cycle: EvaluationCycle) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.upsert_cycle(cycle)
    }

    fn rule(&self, id: RuleId) -> Result<Option<EvaluationRule>, RepositoryError> {
        self.gate()?;
        self.inner.rule(id)
    }

    fn upsert_rule(&self, rule: EvaluationRule) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.upsert_rule(rule)
    }

    fn manual_assignments(&self, cycle: CycleId) -> Result<Vec<ManualAssignment>, RepositoryError> {
        self.gate()?;
        self.inner.manual_assignments(cycle)
    }

    fn insert_manual_assignment(&self, assignment: ManualAssignment) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.insert_manual_assignment(assignment)
    }

    fn cache_employees(&self, employees: Vec<Employee>) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.cache_employees(employees)
    }

    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.gate()?;
        self.inner.employee(id)
    }

    fn indicators(&self) -> Result<Vec<Indicator>, RepositoryError> {
        self.gate()?;
        self.inner.indicators()
    }

    fn upsert_indicator(&self, indicator: Indicator) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.upsert_indicator(indicator)
    }

    fn position_weights(&self) -> Result<Vec<PositionWeight>, RepositoryError> {
        self.gate()?;
        self.inner.position_weights()
    }

    fn upsert_position_weight(&self, weight: PositionWeight) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.upsert_position_weight(weight)
    }

    fn task(&self, id: TaskId) -> Result<Option<EvaluationTask>, RepositoryError> {
        self.gate()?;
        self.inner.task(id)
    }

    fn cycle_tasks(&self, cycle: CycleId) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.gate()?;
        self.inner.cycle_tasks(cycle)
    }

    fn tasks_by_code(&self, code: &str) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.gate()?;
        self.inner.tasks_by_code(code)
    }

    fn codes_outside_cycle(&self, cycle: CycleId) -> Result<HashSet<String>, RepositoryError> {
        self.gate()?;
        self.inner.codes_outside_cycle(cycle)
    }

    fn replace_cycle_tasks(
        &self,
        cycle: CycleId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.gate()?;
        if self.reject_task_replace.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "transaction aborted".to_string(),
            ));
        }
        self.inner.replace_cycle_tasks(cycle, drafts)
    }

    fn update_task(&self, task: EvaluationTask) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.update_task(task)
    }

    fn mark_cycle_overdue(&self, cycle: CycleId) -> Result<usize, RepositoryError> {
        self.gate()?;
        self.inner.mark_cycle_overdue(cycle)
    }

    fn task_scores(&self, task: TaskId) -> Result<Vec<EvaluationScore>, RepositoryError> {
        self.gate()?;
        self.inner.task_scores(task)
    }

    fn cycle_scores(&self, cycle: CycleId) -> Result<Vec<EvaluationScore>, RepositoryError> {
        self.gate()?;
        self.inner.cycle_scores(cycle)
    }

    fn replace_task_scores(
        &self,
        task: EvaluationTask,
        scores: Vec<EvaluationScore>,
    ) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.replace_task_scores(task, scores)
    }

    fn cycle_results(&self, cycle: CycleId) -> Result<Vec<EvaluationResult>, RepositoryError> {
        self.gate()?;
        self.inner.cycle_results(cycle)
    }

    fn replace_cycle_results(
        &self,
        cycle: CycleId,
        results: Vec<EvaluationResult>,
    ) -> Result<(), RepositoryError> {
        self.gate()?;
        self.inner.replace_cycle_results(cycle, results)
    }

    fn finalize_cycle_results(&self, cycle: CycleId) -> Result<usize, RepositoryError> {
        self.gate()?;
        self.inner.finalize_cycle_results(cycle)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
