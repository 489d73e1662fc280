use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregation::ResultAggregator;
use super::codes::{CodeBook, EvaluationCodeIssuer};
use super::domain::{
    CycleId, CycleStats, EvaluationCycle, EvaluationResult, EvaluationScore, EvaluationTask,
    Indicator, IndicatorId, ManualAssignment, RuleId, TaskId, TaskStatus,
};
use super::generator::{
    CoverageShortfall, GenerationError, GenerationPlan, RelationshipGenerator, RunControl,
};
use super::org::{OrgFetchError, OrgSnapshot, OrgSnapshotProvider};
use super::repository::{EvaluationStore, RepositoryError, TaskDraft};
use super::rules::{EvaluationRule, RuleDefinition, RuleViolation};
use super::scoring::{self, ScoreCollector, ScoreSubmission, ScoringError};
use super::weights::WeightResolver;

/// Matches the organization platform client's historical request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub cycle_id: CycleId,
    pub tasks_created: usize,
    pub evaluators: usize,
    pub shortfalls: Vec<CoverageShortfall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub task_id: TaskId,
    pub accepted: usize,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationOutcome {
    pub cycle_id: CycleId,
    pub employees_scored: usize,
}

/// Service composing the org snapshot provider, generator, store and aggregator.
pub struct EvaluationService<S, P> {
    store: Arc<S>,
    org: Arc<P>,
    fetch_timeout: Duration,
}

impl<S, P> EvaluationService<S, P>
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    pub fn new(store: Arc<S>, org: Arc<P>) -> Self {
        Self {
            store,
            org,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn create_cycle(&self, cycle: EvaluationCycle) -> Result<(), EvaluationServiceError> {
        if let Some(rule_id) = cycle.rule_id {
            self.require_rule(rule_id)?;
        }
        self.store.upsert_cycle(cycle)?;
        Ok(())
    }

    /// Validate and store an authored rule.
    pub fn create_rule(
        &self,
        definition: RuleDefinition,
        fallback_id: RuleId,
    ) -> Result<EvaluationRule, EvaluationServiceError> {
        let rule = definition.into_rule(fallback_id)?;
        self.store.upsert_rule(rule.clone())?;
        Ok(rule)
    }

    pub fn add_manual_assignment(
        &self,
        assignment: ManualAssignment,
    ) -> Result<(), EvaluationServiceError> {
        self.require_cycle(assignment.cycle_id)?;
        self.store.insert_manual_assignment(assignment)?;
        Ok(())
    }

    /// Regenerate every task of the cycle. Prior tasks are replaced only on success.
    pub async fn generate_tasks(
        &self,
        cycle_id: CycleId,
    ) -> Result<GenerationOutcome, EvaluationServiceError> {
        self.generate_tasks_with(cycle_id, &RunControl::unbounded())
            .await
    }

    pub async fn generate_tasks_with(
        &self,
        cycle_id: CycleId,
        control: &RunControl,
    ) -> Result<GenerationOutcome, EvaluationServiceError> {
        let cycle = self.require_cycle(cycle_id)?;
        let rule = match cycle.rule_id {
            Some(rule_id) => {
                let rule = self.require_rule(rule_id)?;
                rule.validate()?;
                Some(rule)
            }
            None => None,
        };
        let manual = self.store.manual_assignments(cycle_id)?;

        control.check()?;
        let snapshot = self.fetch_snapshot(control).await?;

        let plan = RelationshipGenerator::new(&snapshot, control).plan(rule.as_ref(), &manual)?;
        control.check()?;

        self.persist_plan(cycle_id, &snapshot, plan)
    }

    async fn fetch_snapshot(&self, control: &RunControl) -> Result<OrgSnapshot, EvaluationServiceError> {
        let limit = control
            .remaining()
            .map_or(self.fetch_timeout, |remaining| remaining.min(self.fetch_timeout));

        let employees = match tokio::time::timeout(limit, self.org.fetch_employees()).await {
            Ok(Ok(employees)) => employees,
            Ok(Err(err)) => {
                warn!(error = %err, "organization snapshot fetch failed");
                return Err(err.into());
            }
            Err(_) => {
                control.check()?;
                warn!(timeout = ?limit, "organization snapshot fetch timed out");
                return Err(OrgFetchError::Timeout(limit).into());
            }
        };

        Ok(OrgSnapshot::from_employees(employees))
    }

    fn persist_plan(
        &self,
        cycle_id: CycleId,
        snapshot: &OrgSnapshot,
        plan: GenerationPlan,
    ) -> Result<GenerationOutcome, EvaluationServiceError> {
        let taken = self.store.codes_outside_cycle(cycle_id)?;
        let mut issuer = EvaluationCodeIssuer::new(rand::rng(), taken);
        let mut book = CodeBook::default();

        let mut drafts = Vec::with_capacity(plan.edges.len());
        for edge in &plan.edges {
            drafts.push(TaskDraft {
                evaluator_id: edge.evaluator_id,
                evaluatee_id: edge.evaluatee_id,
                relation_type: edge.relation_type,
                weight: edge.weight,
                evaluation_code: issuer.code_for(&mut book, edge.evaluator_id)?,
            });
        }

        let tasks = self.store.replace_cycle_tasks(cycle_id, drafts)?;
        self.store
            .cache_employees(snapshot.employees().cloned().collect())?;

        info!(
            cycle_id = %cycle_id,
            tasks_created = tasks.len(),
            evaluators = book.len(),
            shortfalls = plan.shortfalls.len(),
            "generated evaluation tasks"
        );

        Ok(GenerationOutcome {
            cycle_id,
            tasks_created: tasks.len(),
            evaluators: book.len(),
            shortfalls: plan.shortfalls,
        })
    }

    pub fn start_task(&self, task_id: TaskId) -> Result<EvaluationTask, EvaluationServiceError> {
        let mut task = self.require_task(task_id)?;
        scoring::start(&mut task)?;
        self.store.update_task(task.clone())?;
        Ok(task)
    }

    pub fn mark_overdue(&self, task_id: TaskId) -> Result<EvaluationTask, EvaluationServiceError> {
        let mut task = self.require_task(task_id)?;
        scoring::mark_overdue(&mut task)?;
        self.store.update_task(task.clone())?;
        Ok(task)
    }

    /// Mark every open task overdue once `today` is past the cycle's end date.
    pub fn sweep_overdue(
        &self,
        cycle_id: CycleId,
        today: NaiveDate,
    ) -> Result<usize, EvaluationServiceError> {
        let cycle = self.require_cycle(cycle_id)?;
        if today <= cycle.end_date {
            return Ok(0);
        }

        let marked = self.store.mark_cycle_overdue(cycle_id)?;
        if marked > 0 {
            info!(cycle_id = %cycle_id, marked, "marked open tasks overdue");
        }
        Ok(marked)
    }

    /// Replace the task's scores and complete it.
    pub fn submit_task_scores(
        &self,
        task_id: TaskId,
        submissions: Vec<ScoreSubmission>,
    ) -> Result<SubmissionReceipt, EvaluationServiceError> {
        let mut task = self.require_task(task_id)?;
        let indicators = self.indicator_catalogue()?;

        let position = self
            .store
            .employee(task.evaluator_id)?
            .and_then(|evaluator| evaluator.position_id);
        let multiplier =
            WeightResolver::from_weights(self.store.position_weights()?).multiplier_for(position);

        let now = Utc::now();
        let scores = ScoreCollector::new(&indicators).collect(&task, submissions, multiplier, now)?;
        scoring::complete(&mut task, now)?;

        let accepted = scores.len();
        let status = task.status;
        self.store.replace_task_scores(task, scores)?;

        info!(task_id = %task_id, accepted, multiplier, "recorded task scores");
        Ok(SubmissionReceipt {
            task_id,
            accepted,
            status,
        })
    }

    /// Recompute and replace the cycle's ranked results.
    pub fn calculate_cycle_results(
        &self,
        cycle_id: CycleId,
    ) -> Result<CalculationOutcome, EvaluationServiceError> {
        self.require_cycle(cycle_id)?;
        if self
            .store
            .cycle_results(cycle_id)?
            .iter()
            .any(|result| result.is_final)
        {
            return Err(EvaluationServiceError::ResultsFinalized(cycle_id));
        }

        let tasks = self.store.cycle_tasks(cycle_id)?;
        let mut scores: BTreeMap<TaskId, Vec<EvaluationScore>> = BTreeMap::new();
        for score in self.store.cycle_scores(cycle_id)? {
            scores.entry(score.task_id).or_default().push(score);
        }
        let indicators = self.indicator_catalogue()?;

        let results =
            ResultAggregator::new(&indicators).aggregate(cycle_id, &tasks, &scores, Utc::now());
        let employees_scored = results.len();
        self.store.replace_cycle_results(cycle_id, results)?;

        info!(cycle_id = %cycle_id, employees_scored, "calculated cycle results");
        Ok(CalculationOutcome {
            cycle_id,
            employees_scored,
        })
    }

    pub fn finalize_cycle_results(&self, cycle_id: CycleId) -> Result<usize, EvaluationServiceError> {
        self.require_cycle(cycle_id)?;
        let finalized = self.store.finalize_cycle_results(cycle_id)?;
        info!(cycle_id = %cycle_id, finalized, "finalized cycle results");
        Ok(finalized)
    }

    pub fn cycle_tasks(&self, cycle_id: CycleId) -> Result<Vec<EvaluationTask>, EvaluationServiceError> {
        self.require_cycle(cycle_id)?;
        Ok(self.store.cycle_tasks(cycle_id)?)
    }

    pub fn cycle_results(
        &self,
        cycle_id: CycleId,
    ) -> Result<Vec<EvaluationResult>, EvaluationServiceError> {
        self.require_cycle(cycle_id)?;
        let mut results = self.store.cycle_results(cycle_id)?;
        results.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.employee_id.cmp(&b.employee_id)));
        Ok(results)
    }

    pub fn cycle_stats(&self, cycle_id: CycleId) -> Result<CycleStats, EvaluationServiceError> {
        self.require_cycle(cycle_id)?;
        let mut stats = CycleStats {
            cycle_id,
            ..CycleStats::default()
        };
        for task in self.store.cycle_tasks(cycle_id)? {
            stats.total_tasks += 1;
            match task.status {
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Completed => stats.completed_tasks += 1,
                TaskStatus::Overdue => stats.overdue_tasks += 1,
            }
        }
        stats.total_results = self.store.cycle_results(cycle_id)?.len();
        Ok(stats)
    }

    pub fn tasks_for_code(&self, code: &str) -> Result<Vec<EvaluationTask>, EvaluationServiceError> {
        let tasks = self.store.tasks_by_code(code)?;
        if tasks.is_empty() {
            return Err(EvaluationServiceError::UnknownCode(code.to_string()));
        }
        Ok(tasks)
    }

    pub fn task_scores(&self, task_id: TaskId) -> Result<Vec<EvaluationScore>, EvaluationServiceError> {
        self.require_task(task_id)?;
        Ok(self.store.task_scores(task_id)?)
    }

    fn indicator_catalogue(&self) -> Result<BTreeMap<IndicatorId, Indicator>, RepositoryError> {
        Ok(self
            .store
            .indicators()?
            .into_iter()
            .map(|indicator| (indicator.id, indicator))
            .collect())
    }

    fn require_cycle(&self, id: CycleId) -> Result<EvaluationCycle, EvaluationServiceError> {
        self.store
            .cycle(id)?
            .ok_or(EvaluationServiceError::CycleNotFound(id))
    }

    fn require_rule(&self, id: RuleId) -> Result<EvaluationRule, EvaluationServiceError> {
        self.store
            .rule(id)?
            .ok_or(EvaluationServiceError::RuleNotFound(id))
    }

    fn require_task(&self, id: TaskId) -> Result<EvaluationTask, EvaluationServiceError> {
        self.store
            .task(id)?
            .ok_or(EvaluationServiceError::TaskNotFound(id))
    }
}

/// Coarse category used to map service errors onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    ExternalService,
    Conflict,
    Internal,
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error("evaluation cycle {0} not found")]
    CycleNotFound(CycleId),
    #[error("evaluation rule {0} not found")]
    RuleNotFound(RuleId),
    #[error("evaluation task {0} not found")]
    TaskNotFound(TaskId),
    #[error("no tasks found for evaluation code {0}")]
    UnknownCode(String),
    #[error("results for cycle {0} are final and cannot be recalculated")]
    ResultsFinalized(CycleId),
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error(transparent)]
    ExternalService(#[from] OrgFetchError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EvaluationServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluationServiceError::CycleNotFound(_)
            | EvaluationServiceError::RuleNotFound(_)
            | EvaluationServiceError::TaskNotFound(_)
            | EvaluationServiceError::UnknownCode(_)
            | EvaluationServiceError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            EvaluationServiceError::Rule(_) => ErrorKind::Validation,
            EvaluationServiceError::Scoring(ScoringError::InvalidTransition { .. }) => {
                ErrorKind::Conflict
            }
            EvaluationServiceError::Scoring(_) => ErrorKind::Validation,
            EvaluationServiceError::ExternalService(_) => ErrorKind::ExternalService,
            EvaluationServiceError::ResultsFinalized(_)
            | EvaluationServiceError::Repository(RepositoryError::Conflict(_)) => {
                ErrorKind::Conflict
            }
            EvaluationServiceError::Generation(_)
            | EvaluationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                ErrorKind::Internal
            }
        }
    }
}
