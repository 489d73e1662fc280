use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{
    CycleId, EmployeeId, EvaluationResult, EvaluationScore, EvaluationTask, Indicator,
    IndicatorId, RelationType, TaskId, TaskStatus,
};

/// Results are stored with two decimals; ranking compares the rounded values.
pub fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Indicator-weighted mean of a task's scores; `None` when no weight is present.
pub fn task_score(
    scores: &[EvaluationScore],
    indicators: &BTreeMap<IndicatorId, Indicator>,
) -> Option<f64> {
    let (weighted, weight) = scores
        .iter()
        .filter_map(|score| {
            indicators
                .get(&score.indicator_id)
                .map(|indicator| (score.effective_score(), indicator.weight))
        })
        .fold((0.0, 0.0), |(sum, total), (value, weight)| {
            (sum + value * weight, total + weight)
        });

    (weight > 0.0).then(|| weighted / weight)
}

#[derive(Debug, Default)]
struct Accumulator {
    weighted_sum: f64,
    weight_sum: f64,
    by_relation: BTreeMap<RelationType, Vec<f64>>,
}

impl Accumulator {
    fn add(&mut self, relation: RelationType, weight: f64, score: f64) {
        self.weighted_sum += score * weight;
        self.weight_sum += weight;
        self.by_relation.entry(relation).or_default().push(score);
    }

    fn subscore(&self, relation: RelationType) -> Option<f64> {
        self.by_relation
            .get(&relation)
            .filter(|scores| !scores.is_empty())
            .map(|scores| round_score(scores.iter().sum::<f64>() / scores.len() as f64))
    }
}

pub struct ResultAggregator<'a> {
    indicators: &'a BTreeMap<IndicatorId, Indicator>,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(indicators: &'a BTreeMap<IndicatorId, Indicator>) -> Self {
        Self { indicators }
    }

    /// Fold completed tasks into one ranked result per evaluatee.
    pub fn aggregate(
        &self,
        cycle_id: CycleId,
        tasks: &[EvaluationTask],
        scores: &BTreeMap<TaskId, Vec<EvaluationScore>>,
        calculated_at: DateTime<Utc>,
    ) -> Vec<EvaluationResult> {
        let mut accumulators: BTreeMap<EmployeeId, Accumulator> = BTreeMap::new();

        for task in tasks
            .iter()
            .filter(|task| task.cycle_id == cycle_id && task.status == TaskStatus::Completed)
        {
            let Some(task_scores) = scores.get(&task.id) else {
                continue;
            };
            let Some(score) = task_score(task_scores, self.indicators) else {
                continue;
            };
            accumulators
                .entry(task.evaluatee_id)
                .or_default()
                .add(task.relation_type, task.weight, score);
        }

        let mut results: Vec<EvaluationResult> = accumulators
            .into_iter()
            .filter(|(_, acc)| acc.weight_sum > 0.0)
            .map(|(employee_id, acc)| EvaluationResult {
                cycle_id,
                employee_id,
                total_score: round_score(acc.weighted_sum),
                weighted_score: round_score(acc.weighted_sum / acc.weight_sum),
                superior_score: acc.subscore(RelationType::Superior),
                peer_score: acc.subscore(RelationType::Peer),
                subordinate_score: acc.subscore(RelationType::Subordinate),
                rank: 0,
                is_final: false,
                calculated_at,
            })
            .collect();

        assign_dense_ranks(&mut results);
        results
    }
}

/// Sort by weighted score descending (employee id breaks ties) and assign dense ranks.
pub fn assign_dense_ranks(results: &mut [EvaluationResult]) {
    results.sort_by(|a, b| {
        b.weighted_score
            .total_cmp(&a.weighted_score)
            .then(a.employee_id.cmp(&b.employee_id))
    });

    let mut rank = 0;
    let mut previous: Option<f64> = None;
    for result in results.iter_mut() {
        if previous != Some(result.weighted_score) {
            rank += 1;
            previous = Some(result.weighted_score);
        }
        result.rank = rank;
    }
}
