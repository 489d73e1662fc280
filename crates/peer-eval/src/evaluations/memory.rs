use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    CycleId, Employee, EmployeeId, EvaluationCycle, EvaluationResult, EvaluationScore,
    EvaluationTask, Indicator, IndicatorId, ManualAssignment, PositionId, PositionWeight, RuleId,
    TaskId, TaskKey, TaskStatus,
};
use super::repository::{EvaluationStore, RepositoryError, TaskDraft};
use super::rules::EvaluationRule;

#[derive(Debug, Clone, Default)]
struct Tables {
    cycles: BTreeMap<CycleId, EvaluationCycle>,
    rules: BTreeMap<RuleId, EvaluationRule>,
    manual: Vec<ManualAssignment>,
    employees: BTreeMap<EmployeeId, Employee>,
    indicators: BTreeMap<IndicatorId, Indicator>,
    position_weights: BTreeMap<PositionId, PositionWeight>,
    tasks: BTreeMap<TaskId, EvaluationTask>,
    scores: BTreeMap<TaskId, Vec<EvaluationScore>>,
    results: BTreeMap<CycleId, Vec<EvaluationResult>>,
    last_task_id: u64,
}

impl Tables {
    fn cycle_task_ids(&self, cycle: CycleId) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|task| task.cycle_id == cycle)
            .map(|task| task.id)
            .collect()
    }
}

/// Process-local store. Each mutation runs against a staged copy that is
/// swapped in only when the whole operation succeeds.
#[derive(Debug, Default)]
pub struct InMemoryEvaluationStore {
    tables: Mutex<Tables>,
}

impl InMemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, RepositoryError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    fn transact<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let value = f(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

impl EvaluationStore for InMemoryEvaluationStore {
    fn cycle(&self, id: CycleId) -> Result<Option<EvaluationCycle>, RepositoryError> {
        self.read(|tables| tables.cycles.get(&id).cloned())
    }

    fn upsert_cycle(&self, cycle: EvaluationCycle) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            tables.cycles.insert(cycle.id, cycle);
            Ok(())
        })
    }

    fn rule(&self, id: RuleId) -> Result<Option<EvaluationRule>, RepositoryError> {
        self.read(|tables| tables.rules.get(&id).cloned())
    }

    fn upsert_rule(&self, rule: EvaluationRule) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            tables.rules.insert(rule.id, rule);
            Ok(())
        })
    }

    fn manual_assignments(&self, cycle: CycleId) -> Result<Vec<ManualAssignment>, RepositoryError> {
        self.read(|tables| {
            tables
                .manual
                .iter()
                .filter(|assignment| assignment.cycle_id == cycle)
                .cloned()
                .collect()
        })
    }

    fn insert_manual_assignment(&self, assignment: ManualAssignment) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            let duplicate = tables.manual.iter().any(|existing| {
                existing.cycle_id == assignment.cycle_id
                    && existing.evaluator_id == assignment.evaluator_id
                    && existing.evaluatee_id == assignment.evaluatee_id
            });
            if duplicate {
                return Err(RepositoryError::Conflict(format!(
                    "manual assignment {} -> {} already exists for cycle {}",
                    assignment.evaluator_id, assignment.evaluatee_id, assignment.cycle_id
                )));
            }
            tables.manual.push(assignment);
            Ok(())
        })
    }

    fn cache_employees(&self, employees: Vec<Employee>) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            for employee in employees {
                tables.employees.insert(employee.id, employee);
            }
            Ok(())
        })
    }

    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.read(|tables| tables.employees.get(&id).cloned())
    }

    fn indicators(&self) -> Result<Vec<Indicator>, RepositoryError> {
        self.read(|tables| tables.indicators.values().cloned().collect())
    }

    fn upsert_indicator(&self, indicator: Indicator) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            tables.indicators.insert(indicator.id, indicator);
            Ok(())
        })
    }

    fn position_weights(&self) -> Result<Vec<PositionWeight>, RepositoryError> {
        self.read(|tables| tables.position_weights.values().cloned().collect())
    }

    fn upsert_position_weight(&self, weight: PositionWeight) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            tables.position_weights.insert(weight.position_id, weight);
            Ok(())
        })
    }

    fn task(&self, id: TaskId) -> Result<Option<EvaluationTask>, RepositoryError> {
        self.read(|tables| tables.tasks.get(&id).cloned())
    }

    fn cycle_tasks(&self, cycle: CycleId) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.read(|tables| {
            tables
                .tasks
                .values()
                .filter(|task| task.cycle_id == cycle)
                .cloned()
                .collect()
        })
    }

    fn tasks_by_code(&self, code: &str) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.read(|tables| {
            tables
                .tasks
                .values()
                .filter(|task| task.evaluation_code == code)
                .cloned()
                .collect()
        })
    }

    fn codes_outside_cycle(&self, cycle: CycleId) -> Result<HashSet<String>, RepositoryError> {
        self.read(|tables| {
            tables
                .tasks
                .values()
                .filter(|task| task.cycle_id != cycle)
                .map(|task| task.evaluation_code.clone())
                .collect()
        })
    }

    fn replace_cycle_tasks(
        &self,
        cycle: CycleId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<EvaluationTask>, RepositoryError> {
        self.transact(|tables| {
            for id in tables.cycle_task_ids(cycle) {
                tables.tasks.remove(&id);
                tables.scores.remove(&id);
            }

            let foreign_codes: HashSet<&str> = tables
                .tasks
                .values()
                .map(|task| task.evaluation_code.as_str())
                .collect();
            if let Some(draft) = drafts
                .iter()
                .find(|draft| foreign_codes.contains(draft.evaluation_code.as_str()))
            {
                return Err(RepositoryError::Conflict(format!(
                    "evaluation code {} is used by another cycle",
                    draft.evaluation_code
                )));
            }

            let mut keys: HashSet<TaskKey> = HashSet::with_capacity(drafts.len());
            let assigned_at = Utc::now();
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                let task = EvaluationTask {
                    id: TaskId(tables.last_task_id + 1),
                    cycle_id: cycle,
                    evaluator_id: draft.evaluator_id,
                    evaluatee_id: draft.evaluatee_id,
                    relation_type: draft.relation_type,
                    weight: draft.weight,
                    evaluation_code: draft.evaluation_code,
                    status: TaskStatus::Pending,
                    assigned_at,
                    completed_at: None,
                };
                if !keys.insert(task.key()) {
                    return Err(RepositoryError::Conflict(format!(
                        "duplicate {} task {} -> {} in cycle {}",
                        task.relation_type, task.evaluator_id, task.evaluatee_id, cycle
                    )));
                }
                tables.last_task_id += 1;
                tables.tasks.insert(task.id, task.clone());
                created.push(task);
            }

            Ok(created)
        })
    }

    fn update_task(&self, task: EvaluationTask) -> Result<(), RepositoryError> {
        self.transact(|tables| match tables.tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        })
    }

    fn mark_cycle_overdue(&self, cycle: CycleId) -> Result<usize, RepositoryError> {
        self.transact(|tables| {
            let mut marked = 0;
            for task in tables.tasks.values_mut() {
                if task.cycle_id == cycle
                    && matches!(task.status, TaskStatus::Pending | TaskStatus::InProgress)
                {
                    task.status = TaskStatus::Overdue;
                    marked += 1;
                }
            }
            Ok(marked)
        })
    }

    fn task_scores(&self, task: TaskId) -> Result<Vec<EvaluationScore>, RepositoryError> {
        self.read(|tables| tables.scores.get(&task).cloned().unwrap_or_default())
    }

    fn cycle_scores(&self, cycle: CycleId) -> Result<Vec<EvaluationScore>, RepositoryError> {
        self.read(|tables| {
            tables
                .cycle_task_ids(cycle)
                .iter()
                .filter_map(|id| tables.scores.get(id))
                .flatten()
                .cloned()
                .collect()
        })
    }

    fn replace_task_scores(
        &self,
        task: EvaluationTask,
        scores: Vec<EvaluationScore>,
    ) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            if !tables.tasks.contains_key(&task.id) {
                return Err(RepositoryError::NotFound);
            }
            let mut indicators = HashSet::with_capacity(scores.len());
            if let Some(score) = scores.iter().find(|score| !indicators.insert(score.indicator_id)) {
                return Err(RepositoryError::Conflict(format!(
                    "indicator {} scored twice for task {}",
                    score.indicator_id, task.id
                )));
            }
            tables.scores.insert(task.id, scores);
            tables.tasks.insert(task.id, task);
            Ok(())
        })
    }

    fn cycle_results(&self, cycle: CycleId) -> Result<Vec<EvaluationResult>, RepositoryError> {
        self.read(|tables| tables.results.get(&cycle).cloned().unwrap_or_default())
    }

    fn replace_cycle_results(
        &self,
        cycle: CycleId,
        results: Vec<EvaluationResult>,
    ) -> Result<(), RepositoryError> {
        self.transact(|tables| {
            let finalized = tables
                .results
                .get(&cycle)
                .is_some_and(|current| current.iter().any(|result| result.is_final));
            if finalized {
                return Err(RepositoryError::Conflict(format!(
                    "results for cycle {cycle} are final"
                )));
            }
            let mut employees = HashSet::with_capacity(results.len());
            if let Some(result) = results.iter().find(|result| !employees.insert(result.employee_id))
            {
                return Err(RepositoryError::Conflict(format!(
                    "duplicate result for employee {} in cycle {}",
                    result.employee_id, cycle
                )));
            }
            tables.results.insert(cycle, results);
            Ok(())
        })
    }

    fn finalize_cycle_results(&self, cycle: CycleId) -> Result<usize, RepositoryError> {
        self.transact(|tables| {
            let results = tables.results.entry(cycle).or_default();
            for result in results.iter_mut() {
                result.is_final = true;
            }
            Ok(results.len())
        })
    }
}
