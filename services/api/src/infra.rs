use chrono::{Days, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use peer_eval::error::AppError;
use peer_eval::evaluations::{
    CycleId, CycleStatus, EvaluationCycle, EvaluationScope, EvaluationServiceError,
    EvaluationStore, Indicator, IndicatorCategory, IndicatorId, RuleDefinition, RuleId,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Rule attached to the cycle seeded at startup.
pub(crate) const DEFAULT_CYCLE_RULE: RuleId = RuleId(2);
const DEFAULT_CYCLE_LENGTH_DAYS: u64 = 90;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(relation, weight)| (relation.to_string(), *weight))
        .collect()
}

fn definition(
    name: &str,
    relation_types: &[&str],
    relation_weights: &[(&str, f64)],
) -> RuleDefinition {
    RuleDefinition {
        id: None,
        name: name.to_string(),
        relation_types: relation_types.iter().map(|r| r.to_string()).collect(),
        evaluation_scope: Default::default(),
        max_evaluators_per_relation: 3,
        min_evaluators_per_relation: 1,
        relation_weights: weights(relation_weights),
        allow_cross_department: false,
        allow_cross_unit: false,
        allow_self_evaluation: false,
        position_level_diff_limit: 5,
        superior_strategy: Default::default(),
    }
}

/// Built-in rule catalogue, numbered from 1 in this order.
pub(crate) fn default_rules() -> Vec<RuleDefinition> {
    let mut superior_only = definition("Superior only", &["superior"], &[("superior", 1.0)]);
    superior_only.max_evaluators_per_relation = 1;

    let mut full_circle = definition(
        "360 review",
        &["superior", "peer", "subordinate", "self"],
        &[
            ("superior", 0.5),
            ("peer", 0.3),
            ("subordinate", 0.1),
            ("self", 0.1),
        ],
    );
    full_circle.allow_self_evaluation = true;

    let mut peer_review = definition("Peer review", &["peer"], &[("peer", 1.0)]);
    peer_review.min_evaluators_per_relation = 2;
    peer_review.max_evaluators_per_relation = 5;
    peer_review.allow_cross_department = true;

    let mut cross_department = definition(
        "Cross-department",
        &["superior", "cross_superior", "peer", "cross_peer"],
        &[
            ("superior", 0.4),
            ("cross_superior", 0.2),
            ("peer", 0.2),
            ("cross_peer", 0.2),
        ],
    );
    cross_department.evaluation_scope = EvaluationScope::Company;
    cross_department.allow_cross_department = true;

    vec![superior_only, full_circle, peer_review, cross_department]
}

pub(crate) fn default_indicators() -> Vec<Indicator> {
    [
        (1, "Delivery against goals", IndicatorCategory::Performance, 0.30),
        (2, "Professional skills", IndicatorCategory::Ability, 0.25),
        (3, "Ownership", IndicatorCategory::Attitude, 0.20),
        (4, "Collaboration", IndicatorCategory::Teamwork, 0.15),
        (5, "Improvement ideas", IndicatorCategory::Innovation, 0.10),
    ]
    .into_iter()
    .map(|(id, name, category, weight)| Indicator {
        id: IndicatorId(id),
        name: name.to_string(),
        category,
        weight,
        max_score: 100,
        active: true,
    })
    .collect()
}

/// Store the built-in rules and indicators.
pub(crate) fn seed_catalogue<S: EvaluationStore>(store: &S) -> Result<(), EvaluationServiceError> {
    for (index, definition) in default_rules().into_iter().enumerate() {
        let rule = definition.into_rule(RuleId(index as u64 + 1))?;
        store.upsert_rule(rule)?;
    }
    for indicator in default_indicators() {
        store.upsert_indicator(indicator)?;
    }
    Ok(())
}

pub(crate) fn seed_cycle<S: EvaluationStore>(
    store: &S,
    id: CycleId,
    start_date: NaiveDate,
    rule_id: Option<RuleId>,
) -> Result<EvaluationCycle, EvaluationServiceError> {
    let end_date = start_date
        .checked_add_days(Days::new(DEFAULT_CYCLE_LENGTH_DAYS))
        .unwrap_or(start_date);
    let cycle = EvaluationCycle {
        id,
        name: format!("Review cycle starting {start_date}"),
        start_date,
        end_date,
        status: CycleStatus::Active,
        rule_id,
    };
    store.upsert_cycle(cycle.clone())?;
    Ok(cycle)
}

/// Rule definition authored as JSON.
pub(crate) fn load_rule(path: &Path) -> Result<RuleDefinition, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
