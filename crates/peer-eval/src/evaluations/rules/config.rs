use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{EvaluationScope, RelationType, RuleId};
use super::validation::{check_rule, RuleViolation};

/// Weight used for a relation type that has no explicit entry.
pub const DEFAULT_RELATION_WEIGHT: f64 = 1.0;

/// Keeps the default 12 → 9 → 4 bands reachable when a rule omits the limit.
pub const DEFAULT_LEVEL_DIFF_LIMIT: u32 = 5;

/// How edges from the band above into this band are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandLink {
    /// Department, unit and level-difference checks from the rule.
    #[default]
    Admission,
    /// Evaluator and evaluatee must share a department; level difference still applies.
    SameDepartment,
}

/// Contiguous range of position levels used by the superior generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBand {
    pub min_level: i32,
    /// `None` leaves the band open towards senior levels.
    #[serde(default)]
    pub max_level: Option<i32>,
    #[serde(default)]
    pub link: BandLink,
}

impl LevelBand {
    pub fn exact(level: i32, link: BandLink) -> Self {
        Self {
            min_level: level,
            max_level: Some(level),
            link,
        }
    }

    pub fn at_least(level: i32) -> Self {
        Self {
            min_level: level,
            max_level: None,
            link: BandLink::Admission,
        }
    }

    pub fn contains(&self, level: i32) -> bool {
        level >= self.min_level && self.max_level.map_or(true, |max| level <= max)
    }
}

/// Senior-to-junior bands matching the historical high-level / manager / supervisor split.
pub fn default_superior_bands() -> Vec<LevelBand> {
    vec![
        LevelBand::at_least(12),
        LevelBand::exact(9, BandLink::Admission),
        LevelBand::exact(4, BandLink::SameDepartment),
    ]
}

/// Selects how `superior` edges are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SuperiorStrategy {
    /// Every employee of a band evaluates every employee of the next, more junior band.
    LevelBands { bands: Vec<LevelBand> },
    /// Direct supervisor evaluates each report, subject to the admission filter.
    ReportingLine,
}

impl Default for SuperiorStrategy {
    fn default() -> Self {
        SuperiorStrategy::LevelBands {
            bands: default_superior_bands(),
        }
    }
}

/// Validated rule driving relationship generation for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRule {
    pub id: RuleId,
    pub name: String,
    pub relation_types: Vec<RelationType>,
    pub evaluation_scope: EvaluationScope,
    pub max_evaluators_per_relation: u32,
    pub min_evaluators_per_relation: u32,
    pub relation_weights: BTreeMap<RelationType, f64>,
    pub allow_cross_department: bool,
    pub allow_cross_unit: bool,
    pub allow_self_evaluation: bool,
    pub position_level_diff_limit: u32,
    pub superior_strategy: SuperiorStrategy,
}

impl EvaluationRule {
    pub fn relation_weight(&self, relation: RelationType) -> f64 {
        self.relation_weights
            .get(&relation)
            .copied()
            .unwrap_or(DEFAULT_RELATION_WEIGHT)
    }

    pub fn enables(&self, relation: RelationType) -> bool {
        self.relation_types.contains(&relation)
    }

    pub fn evaluator_limit(&self) -> usize {
        self.max_evaluators_per_relation as usize
    }

    /// Re-run validation, e.g. on a rule loaded from storage before generating.
    pub fn validate(&self) -> Result<(), RuleViolation> {
        check_rule(self)
    }
}

/// Rule as authored by administrators; relation names are still free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: Option<RuleId>,
    pub name: String,
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub evaluation_scope: EvaluationScope,
    #[serde(default = "default_max_evaluators")]
    pub max_evaluators_per_relation: u32,
    #[serde(default = "default_min_evaluators")]
    pub min_evaluators_per_relation: u32,
    #[serde(default)]
    pub relation_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub allow_cross_department: bool,
    #[serde(default)]
    pub allow_cross_unit: bool,
    #[serde(default)]
    pub allow_self_evaluation: bool,
    #[serde(default = "default_level_diff_limit")]
    pub position_level_diff_limit: u32,
    #[serde(default)]
    pub superior_strategy: SuperiorStrategy,
}

fn default_max_evaluators() -> u32 {
    3
}

fn default_min_evaluators() -> u32 {
    1
}

fn default_level_diff_limit() -> u32 {
    DEFAULT_LEVEL_DIFF_LIMIT
}

impl RuleDefinition {
    /// Resolve relation names and validate the resulting rule.
    pub fn into_rule(self, fallback_id: RuleId) -> Result<EvaluationRule, RuleViolation> {
        let mut relation_types = Vec::with_capacity(self.relation_types.len());
        for raw in &self.relation_types {
            let relation = raw.parse::<RelationType>()?;
            if !relation_types.contains(&relation) {
                relation_types.push(relation);
            }
        }

        let mut relation_weights = BTreeMap::new();
        for (raw, weight) in &self.relation_weights {
            relation_weights.insert(raw.parse::<RelationType>()?, *weight);
        }

        let rule = EvaluationRule {
            id: self.id.unwrap_or(fallback_id),
            name: self.name,
            relation_types,
            evaluation_scope: self.evaluation_scope,
            max_evaluators_per_relation: self.max_evaluators_per_relation,
            min_evaluators_per_relation: self.min_evaluators_per_relation,
            relation_weights,
            allow_cross_department: self.allow_cross_department,
            allow_cross_unit: self.allow_cross_unit,
            allow_self_evaluation: self.allow_self_evaluation,
            position_level_diff_limit: self.position_level_diff_limit,
            superior_strategy: self.superior_strategy,
        };

        check_rule(&rule)?;
        Ok(rule)
    }
}
