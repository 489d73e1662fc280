use std::collections::BTreeMap;

use chrono::Utc;

use super::common::{completed_task, indicator, raw_score};
use crate::evaluations::aggregation::{assign_dense_ranks, round_score, task_score, ResultAggregator};
use crate::evaluations::domain::{
    CycleId, EmployeeId, EvaluationResult, EvaluationScore, Indicator, IndicatorId, RelationType,
    TaskId, TaskStatus,
};

fn catalogue() -> BTreeMap<IndicatorId, Indicator> {
    [indicator(1, 0.6), indicator(2, 0.4)]
        .into_iter()
        .map(|indicator| (indicator.id, indicator))
        .collect()
}

fn scores_for(entries: &[(u64, u8, u8)]) -> BTreeMap<TaskId, Vec<EvaluationScore>> {
    entries
        .iter()
        .map(|&(task, first, second)| {
            (
                TaskId(task),
                vec![raw_score(task, 1, first), raw_score(task, 2, second)],
            )
        })
        .collect()
}

fn result(employee: u64, weighted: f64) -> EvaluationResult {
    EvaluationResult {
        cycle_id: CycleId(1),
        employee_id: EmployeeId(employee),
        total_score: weighted,
        weighted_score: weighted,
        superior_score: None,
        peer_score: None,
        subordinate_score: None,
        rank: 0,
        is_final: false,
        calculated_at: Utc::now(),
    }
}

#[test]
fn single_superior_task_scores_eighty_four() {
    let indicators = catalogue();
    let tasks = vec![completed_task(1, 10, RelationType::Superior, 1.0)];
    let scores = scores_for(&[(1, 80, 90)]);

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());

    assert_eq!(results.len(), 1);
    let outcome = &results[0];
    assert_eq!(outcome.employee_id, EmployeeId(10));
    assert_eq!(outcome.weighted_score, 84.0);
    assert_eq!(outcome.total_score, 84.0);
    assert_eq!(outcome.superior_score, Some(84.0));
    assert_eq!(outcome.peer_score, None);
    assert_eq!(outcome.subordinate_score, None);
    assert_eq!(outcome.rank, 1);
    assert!(!outcome.is_final);
}

#[test]
fn relation_weights_blend_task_scores() {
    let indicators = catalogue();
    let tasks = vec![
        completed_task(1, 10, RelationType::Superior, 0.5),
        completed_task(2, 10, RelationType::Peer, 0.3),
        completed_task(3, 10, RelationType::Peer, 0.3),
    ];
    // Task scores: 90, 70 and 80.
    let scores = scores_for(&[(1, 90, 90), (2, 70, 70), (3, 80, 80)]);

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());

    let outcome = &results[0];
    assert_eq!(outcome.total_score, 90.0);
    assert_eq!(outcome.weighted_score, round_score(90.0 / 1.1));
    assert_eq!(outcome.superior_score, Some(90.0));
    assert_eq!(outcome.peer_score, Some(75.0));
}

#[test]
fn position_multiplier_flows_through_weighted_scores() {
    let indicators = catalogue();
    let tasks = vec![completed_task(1, 10, RelationType::Superior, 1.0)];
    let mut scores = scores_for(&[(1, 80, 90)]);
    for score in scores.values_mut().flatten() {
        score.weighted_score = Some(f64::from(score.score) * 1.5);
    }

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());
    assert_eq!(results[0].weighted_score, 126.0);
}

#[test]
fn ties_share_a_dense_rank_in_employee_order() {
    let indicators = catalogue();
    let tasks = vec![
        completed_task(1, 30, RelationType::Superior, 1.0),
        completed_task(2, 20, RelationType::Superior, 1.0),
        completed_task(3, 10, RelationType::Superior, 1.0),
    ];
    let scores = scores_for(&[(1, 90, 90), (2, 80, 90), (3, 80, 90)]);

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());

    let ranked: Vec<(u64, f64, u32)> = results
        .iter()
        .map(|r| (r.employee_id.0, r.weighted_score, r.rank))
        .collect();
    assert_eq!(ranked, vec![(30, 90.0, 1), (10, 84.0, 2), (20, 84.0, 2)]);
}

#[test]
fn dense_ranks_do_not_skip_after_ties() {
    let mut results = vec![
        result(4, 70.0),
        result(2, 84.0),
        result(1, 90.0),
        result(3, 84.0),
    ];
    assign_dense_ranks(&mut results);

    let ranks: Vec<(u64, u32)> = results.iter().map(|r| (r.employee_id.0, r.rank)).collect();
    assert_eq!(ranks, vec![(1, 1), (2, 2), (3, 2), (4, 3)]);
}

#[test]
fn zero_weight_evaluatees_are_left_out() {
    let indicators = catalogue();
    let tasks = vec![
        completed_task(1, 10, RelationType::Peer, 0.0),
        completed_task(2, 11, RelationType::Superior, 1.0),
    ];
    let scores = scores_for(&[(1, 80, 90), (2, 60, 60)]);

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].employee_id, EmployeeId(11));
    assert_eq!(results[0].rank, 1);
}

#[test]
fn open_tasks_and_unscored_tasks_are_ignored() {
    let indicators = catalogue();
    let mut pending = completed_task(1, 10, RelationType::Superior, 1.0);
    pending.status = TaskStatus::Pending;
    pending.completed_at = None;
    let tasks = vec![
        pending,
        completed_task(2, 10, RelationType::Peer, 1.0),
        completed_task(3, 10, RelationType::Peer, 1.0),
    ];
    let scores = scores_for(&[(1, 10, 10), (2, 70, 70)]);

    let results =
        ResultAggregator::new(&indicators).aggregate(CycleId(1), &tasks, &scores, Utc::now());

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].weighted_score, 70.0);
    assert_eq!(results[0].superior_score, None);
}

#[test]
fn task_score_skips_unknown_indicators() {
    let indicators = catalogue();
    let scores = vec![raw_score(1, 1, 80), raw_score(1, 99, 0)];
    assert_eq!(task_score(&scores, &indicators).map(round_score), Some(80.0));
    assert_eq!(task_score(&[raw_score(1, 99, 50)], &indicators), None);
}
