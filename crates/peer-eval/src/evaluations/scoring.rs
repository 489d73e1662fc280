use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    EvaluationScore, EvaluationTask, Indicator, IndicatorId, TaskId, TaskStatus,
};

pub const MAX_RAW_SCORE: i32 = 100;

/// One indicator score as submitted by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub indicator_id: IndicatorId,
    pub score: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("a submission must contain at least one score")]
    EmptySubmission,
    #[error("score {score} for indicator {indicator_id} is outside 0..=100")]
    ScoreOutOfRange { indicator_id: IndicatorId, score: i32 },
    #[error("indicator {0} appears more than once")]
    DuplicateIndicator(IndicatorId),
    #[error("indicator {0} does not exist")]
    UnknownIndicator(IndicatorId),
    #[error("indicator {0} is not active")]
    InactiveIndicator(IndicatorId),
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Validates submissions against the indicator catalogue and stamps weighted scores.
pub struct ScoreCollector<'a> {
    indicators: &'a BTreeMap<IndicatorId, Indicator>,
}

impl<'a> ScoreCollector<'a> {
    pub fn new(indicators: &'a BTreeMap<IndicatorId, Indicator>) -> Self {
        Self { indicators }
    }

    pub fn collect(
        &self,
        task: &EvaluationTask,
        submissions: Vec<ScoreSubmission>,
        multiplier: f64,
        submitted_at: DateTime<Utc>,
    ) -> Result<Vec<EvaluationScore>, ScoringError> {
        if submissions.is_empty() {
            return Err(ScoringError::EmptySubmission);
        }

        let mut seen = HashSet::with_capacity(submissions.len());
        let mut scores = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let indicator = self
                .indicators
                .get(&submission.indicator_id)
                .ok_or(ScoringError::UnknownIndicator(submission.indicator_id))?;
            if !indicator.active {
                return Err(ScoringError::InactiveIndicator(indicator.id));
            }
            if !seen.insert(submission.indicator_id) {
                return Err(ScoringError::DuplicateIndicator(submission.indicator_id));
            }
            let score = u8::try_from(submission.score)
                .ok()
                .filter(|score| i32::from(*score) <= MAX_RAW_SCORE)
                .ok_or(ScoringError::ScoreOutOfRange {
                    indicator_id: submission.indicator_id,
                    score: submission.score,
                })?;

            scores.push(EvaluationScore {
                task_id: task.id,
                indicator_id: submission.indicator_id,
                score,
                weighted_score: Some(f64::from(score) * multiplier),
                comment: submission.comment,
                submitted_at,
            });
        }

        Ok(scores)
    }
}

fn transition(
    task: &mut EvaluationTask,
    allowed_from: &[TaskStatus],
    to: TaskStatus,
) -> Result<(), ScoringError> {
    if !allowed_from.contains(&task.status) {
        return Err(ScoringError::InvalidTransition {
            task_id: task.id,
            from: task.status,
            to,
        });
    }
    task.status = to;
    Ok(())
}

/// pending → in_progress
pub fn start(task: &mut EvaluationTask) -> Result<(), ScoringError> {
    transition(task, &[TaskStatus::Pending], TaskStatus::InProgress)
}

/// pending | in_progress → overdue
pub fn mark_overdue(task: &mut EvaluationTask) -> Result<(), ScoringError> {
    transition(
        task,
        &[TaskStatus::Pending, TaskStatus::InProgress],
        TaskStatus::Overdue,
    )
}

/// Any status → completed; resubmitting a completed task refreshes `completed_at`.
pub fn complete(task: &mut EvaluationTask, completed_at: DateTime<Utc>) -> Result<(), ScoringError> {
    transition(
        task,
        &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Overdue,
            TaskStatus::Completed,
        ],
        TaskStatus::Completed,
    )?;
    task.completed_at = Some(completed_at);
    Ok(())
}
