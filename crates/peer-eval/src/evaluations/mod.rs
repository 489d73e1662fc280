//! Evaluation-relationship generation and weighted score aggregation.
//!
//! Data flows from an [`OrgSnapshotProvider`] through the [`RelationshipGenerator`] into an
//! [`EvaluationStore`], where tasks collect scores that the [`ResultAggregator`] folds into
//! ranked per-employee results.

pub mod aggregation;
pub mod codes;
pub mod domain;
pub mod generator;
pub mod memory;
pub mod org;
pub mod repository;
pub mod router;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod weights;

#[cfg(test)]
mod tests;

pub use aggregation::{assign_dense_ranks, round_score, task_score, ResultAggregator};
pub use codes::{CodeBook, EvaluationCodeIssuer, CODE_LENGTH};
pub use domain::{
    CycleId, CycleStats, CycleStatus, DepartmentId, Employee, EmployeeId, EvaluationCycle,
    EvaluationResult, EvaluationScope, EvaluationScore, EvaluationTask, Indicator,
    IndicatorCategory, IndicatorId, ManualAssignment, PositionId, PositionWeight, RelationType,
    RuleId, TaskId, TaskKey, TaskStatus, UnitId, UnknownRelationType,
};
pub use generator::{
    is_evaluation_allowed, CoverageShortfall, GenerationError, GenerationPlan, PlannedEdge,
    RelationshipGenerator, RunControl,
};
pub use memory::InMemoryEvaluationStore;
pub use org::{
    OrgExportFile, OrgFetchError, OrgPlatformClient, OrgSnapshot, OrgSnapshotProvider,
    StaticOrgProvider,
};
pub use repository::{EvaluationStore, RepositoryError, TaskDraft};
pub use router::{evaluation_router, SubmitScoresRequest};
pub use rules::{
    BandLink, EvaluationRule, LevelBand, RuleDefinition, RuleViolation, SuperiorStrategy,
};
pub use scoring::{ScoreCollector, ScoreSubmission, ScoringError};
pub use service::{
    CalculationOutcome, ErrorKind, EvaluationService, EvaluationServiceError, GenerationOutcome,
    SubmissionReceipt,
};
pub use weights::WeightResolver;
