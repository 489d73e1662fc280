use super::super::domain::{RelationType, UnknownRelationType};
use super::config::{EvaluationRule, SuperiorStrategy};

/// Allowed distance between the relation-weight sum and 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;
/// Slack for binary rounding so sums of exactly 0.99 and 1.01 stay accepted.
const FLOAT_SLACK: f64 = 1e-9;

/// Validation errors raised for malformed evaluation rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleViolation {
    #[error(transparent)]
    UnknownRelationType(#[from] UnknownRelationType),
    #[error("relation weights sum to {sum:.3}, expected 1.00 within 0.01")]
    WeightSum { sum: f64 },
    #[error("weight {weight} for relation '{relation}' must lie within [0, 1]")]
    WeightOutOfRange { relation: RelationType, weight: f64 },
    #[error("evaluator bounds invalid: min {min}, max {max} (need 1 <= min <= max)")]
    EvaluatorBounds { min: u32, max: u32 },
    #[error("rule enables no relation types")]
    NoRelationTypes,
    #[error("level band {index} is invalid: {reason}")]
    InvalidBand { index: usize, reason: String },
}

pub fn check_rule(rule: &EvaluationRule) -> Result<(), RuleViolation> {
    if rule.relation_types.is_empty() {
        return Err(RuleViolation::NoRelationTypes);
    }

    let min = rule.min_evaluators_per_relation;
    let max = rule.max_evaluators_per_relation;
    if min < 1 || max < min {
        return Err(RuleViolation::EvaluatorBounds { min, max });
    }

    for (relation, weight) in &rule.relation_weights {
        if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
            return Err(RuleViolation::WeightOutOfRange {
                relation: *relation,
                weight: *weight,
            });
        }
    }

    let sum: f64 = rule.relation_weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE + FLOAT_SLACK {
        return Err(RuleViolation::WeightSum { sum });
    }

    if let SuperiorStrategy::LevelBands { bands } = &rule.superior_strategy {
        for (index, band) in bands.iter().enumerate() {
            if let Some(max_level) = band.max_level {
                if max_level < band.min_level {
                    return Err(RuleViolation::InvalidBand {
                        index,
                        reason: format!(
                            "max_level {max_level} is below min_level {}",
                            band.min_level
                        ),
                    });
                }
            }
        }

        for (index, pair) in bands.windows(2).enumerate() {
            if pair[1].max_level.map_or(true, |max| max >= pair[0].min_level) {
                return Err(RuleViolation::InvalidBand {
                    index: index + 1,
                    reason: "bands must be ordered senior to junior without overlap".to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::config::{LevelBand, RuleDefinition};
    use super::*;
    use crate::evaluations::domain::{EvaluationScope, RuleId};

    fn definition(weights: &[(&str, f64)]) -> RuleDefinition {
        RuleDefinition {
            id: None,
            name: "360".to_string(),
            relation_types: vec![
                "superior".to_string(),
                "peer".to_string(),
                "subordinate".to_string(),
                "self".to_string(),
            ],
            evaluation_scope: EvaluationScope::Department,
            max_evaluators_per_relation: 3,
            min_evaluators_per_relation: 1,
            relation_weights: weights
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect::<BTreeMap<_, _>>(),
            allow_cross_department: false,
            allow_cross_unit: false,
            allow_self_evaluation: true,
            position_level_diff_limit: 5,
            superior_strategy: SuperiorStrategy::default(),
        }
    }

    #[test]
    fn accepts_weights_within_tolerance() {
        let rule = definition(&[
            ("superior", 0.5),
            ("peer", 0.3),
            ("subordinate", 0.1),
            ("self", 0.105),
        ])
        .into_rule(RuleId(1))
        .expect("sum 1.005 is within tolerance");
        assert_eq!(rule.relation_weight(RelationType::Superior), 0.5);
        assert_eq!(rule.relation_weight(RelationType::CrossPeer), 1.0);
    }

    #[test]
    fn tolerance_bounds_are_inclusive() {
        for (peer, accepted) in [(0.49, true), (0.51, true), (0.48, false), (0.52, false)] {
            let raw = definition(&[("superior", 0.5), ("peer", peer)]);
            let outcome = raw.into_rule(RuleId(1));
            assert_eq!(outcome.is_ok(), accepted, "peer weight {peer}: {outcome:?}");
        }
    }

    #[test]
    fn rejects_weight_sums_outside_tolerance() {
        let low = definition(&[("superior", 0.5), ("peer", 0.3), ("self", 0.18)]);
        match low.into_rule(RuleId(1)) {
            Err(RuleViolation::WeightSum { sum }) => assert!((sum - 0.98).abs() < 1e-9),
            other => panic!("expected weight sum violation, got {other:?}"),
        }

        let high = definition(&[("superior", 0.6), ("peer", 0.42)]);
        assert!(matches!(
            high.into_rule(RuleId(1)),
            Err(RuleViolation::WeightSum { .. })
        ));
    }

    #[test]
    fn rejects_unknown_relation_types() {
        let mut raw = definition(&[("superior", 1.0)]);
        raw.relation_types.push("skip_level".to_string());
        match raw.into_rule(RuleId(1)) {
            Err(RuleViolation::UnknownRelationType(UnknownRelationType(name))) => {
                assert_eq!(name, "skip_level")
            }
            other => panic!("expected unknown relation type, got {other:?}"),
        }

        let weights = definition(&[("superior", 0.5), ("mentor", 0.5)]);
        assert!(matches!(
            weights.into_rule(RuleId(1)),
            Err(RuleViolation::UnknownRelationType(_))
        ));
    }

    #[test]
    fn rejects_max_below_min() {
        let mut raw = definition(&[("superior", 1.0)]);
        raw.max_evaluators_per_relation = 1;
        raw.min_evaluators_per_relation = 2;
        assert_eq!(
            raw.into_rule(RuleId(1)),
            Err(RuleViolation::EvaluatorBounds { min: 2, max: 1 })
        );
    }

    #[test]
    fn rejects_overlapping_bands() {
        let mut raw = definition(&[("superior", 1.0)]);
        raw.superior_strategy = SuperiorStrategy::LevelBands {
            bands: vec![LevelBand::at_least(8), LevelBand::at_least(4)],
        };
        assert!(matches!(
            raw.into_rule(RuleId(1)),
            Err(RuleViolation::InvalidBand { index: 1, .. })
        ));
    }
}
